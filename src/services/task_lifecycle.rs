//! Claim, edit and submit one human task at a time.
//!
//! A controller acts for a single actor and is bound to at most one task.
//! Every remote call captures the binding epoch; if the controller has been
//! rebound or unbound by the time the reply arrives, the reply is discarded
//! instead of being applied to the wrong task. At most one claim or submit
//! is in flight per bound task.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::form::{FormSchema, FormState};
use crate::domain::models::task::{MutationState, SubmitBlock, TaskInstance, TaskPhase};
use crate::domain::ports::{EngineError, ProcessEngine};
use crate::services::form_normalizer::normalize_schema;

/// Active tasks as last listed by the engine.
#[derive(Debug, Default)]
pub struct TaskCache {
    tasks: RwLock<Vec<TaskInstance>>,
}

impl TaskCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cache with the engine's current task list.
    pub async fn refresh<E: ProcessEngine + ?Sized>(&self, engine: &E) -> DomainResult<Vec<TaskInstance>> {
        let tasks = engine
            .list_tasks()
            .await
            .map_err(|e| DomainError::retrieval("task list", e.to_string()))?;
        *self.tasks.write().await = tasks.clone();
        Ok(tasks)
    }

    pub async fn list(&self) -> Vec<TaskInstance> {
        self.tasks.read().await.clone()
    }

    pub async fn get(&self, task_id: &str) -> Option<TaskInstance> {
        self.tasks.read().await.iter().find(|t| t.id == task_id).cloned()
    }

    pub async fn upsert(&self, task: TaskInstance) {
        let mut tasks = self.tasks.write().await;
        match tasks.iter_mut().find(|t| t.id == task.id) {
            Some(existing) => *existing = task,
            None => tasks.push(task),
        }
    }

    /// Returns whether the task was cached.
    pub async fn remove(&self, task_id: &str) -> bool {
        let mut tasks = self.tasks.write().await;
        let before = tasks.len();
        tasks.retain(|t| t.id != task_id);
        tasks.len() != before
    }
}

/// Snapshot of the bound task for display.
#[derive(Debug, Clone, Serialize)]
pub struct TaskView {
    pub task: TaskInstance,
    pub phase: TaskPhase,
    pub schema: FormSchema,
    pub form: FormState,
    pub pending: bool,
}

struct BoundTask {
    task: TaskInstance,
    schema: FormSchema,
    phase: TaskPhase,
    form: FormState,
    mutation: MutationState,
}

impl BoundTask {
    fn view(&self) -> TaskView {
        TaskView {
            task: self.task.clone(),
            phase: self.phase,
            schema: self.schema.clone(),
            form: self.form.clone(),
            pending: self.mutation == MutationState::Pending,
        }
    }

    fn submit_blocks(&self, actor: &str) -> Vec<SubmitBlock> {
        let mut blocks = Vec::new();
        if self.form.has_errors() {
            blocks.push(SubmitBlock::FormErrors);
        }
        if !self.task.is_assigned_to(actor) {
            blocks.push(SubmitBlock::NotAssignedToActor);
        }
        if !self.form.is_changed() {
            blocks.push(SubmitBlock::Unchanged);
        }
        blocks
    }

    /// Editing or Submittable, from the current form and assignee.
    fn recompute(&mut self, actor: &str) {
        if !self.phase.is_held() {
            return;
        }
        let next = if self.submit_blocks(actor).is_empty() {
            TaskPhase::Submittable
        } else {
            TaskPhase::Editing
        };
        if next != self.phase && self.phase.can_transition_to(next) {
            debug!(task_id = %self.task.id, from = %self.phase, to = %next, "task phase changed");
            self.phase = next;
        }
    }

    /// Follow the engine's view of the assignee.
    fn reconcile(&mut self, task: TaskInstance, actor: &str) {
        self.task = task;
        match (self.task.is_claimed(), self.phase) {
            (false, phase) if phase.is_held() => {
                info!(task_id = %self.task.id, "task no longer assigned; back to unclaimed");
                self.phase = TaskPhase::Unclaimed;
            }
            (true, TaskPhase::Unclaimed) => {
                self.phase = TaskPhase::Claimed;
                // Edits made before the claim count toward submittability.
                if self.form.is_changed() {
                    self.recompute(actor);
                }
            }
            (true, TaskPhase::Editing | TaskPhase::Submittable) => self.recompute(actor),
            _ => {}
        }
    }
}

#[derive(Default)]
struct Binding {
    epoch: u64,
    bound: Option<BoundTask>,
}

fn initial_phase(task: &TaskInstance) -> TaskPhase {
    if task.is_claimed() {
        TaskPhase::Claimed
    } else {
        TaskPhase::Unclaimed
    }
}

/// Marks the bound task's single mutation slot as taken. Dropping the guard
/// without completing frees the slot again.
struct MutationGuard<'a> {
    state: &'a Mutex<Binding>,
    epoch: u64,
}

impl Drop for MutationGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.epoch == self.epoch {
            if let Some(bound) = state.bound.as_mut() {
                bound.mutation = MutationState::Idle;
            }
        }
    }
}

pub struct TaskLifecycleController<E: ProcessEngine> {
    engine: Arc<E>,
    actor: String,
    cache: Arc<TaskCache>,
    state: Mutex<Binding>,
}

impl<E: ProcessEngine> TaskLifecycleController<E> {
    pub fn new(engine: Arc<E>, actor: impl Into<String>) -> Self {
        Self {
            engine,
            actor: actor.into(),
            cache: Arc::new(TaskCache::new()),
            state: Mutex::new(Binding::default()),
        }
    }

    /// Share a task cache with other controllers or the task list view.
    pub fn with_cache(mut self, cache: Arc<TaskCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn actor(&self) -> &str {
        &self.actor
    }

    pub fn cache(&self) -> &Arc<TaskCache> {
        &self.cache
    }

    fn lock(&self) -> MutexGuard<'_, Binding> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn view(&self) -> Option<TaskView> {
        self.lock().bound.as_ref().map(BoundTask::view)
    }

    pub fn phase(&self) -> Option<TaskPhase> {
        self.lock().bound.as_ref().map(|b| b.phase)
    }

    /// Apply a reply to the binding it was requested for.
    fn apply<T>(
        &self,
        epoch: u64,
        task_id: &str,
        f: impl FnOnce(&mut BoundTask) -> T,
    ) -> DomainResult<T> {
        let mut state = self.lock();
        let current = state.epoch;
        match state.bound.as_mut() {
            Some(bound) if current == epoch => Ok(f(bound)),
            _ => {
                debug!(task_id, "late reply discarded");
                Err(DomainError::Discarded {
                    entity: "task".to_string(),
                    id: task_id.to_string(),
                })
            }
        }
    }

    /// Take the mutation slot of the bound task after `check` accepts it.
    fn begin_mutation<T>(
        &self,
        task_id: &str,
        check: impl FnOnce(&BoundTask) -> DomainResult<T>,
    ) -> DomainResult<(MutationGuard<'_>, T)> {
        let mut state = self.lock();
        let epoch = state.epoch;
        let bound = state
            .bound
            .as_mut()
            .filter(|b| b.task.id == task_id)
            .ok_or_else(|| DomainError::TaskNotBound(task_id.to_string()))?;

        if bound.mutation == MutationState::Pending {
            return Err(DomainError::OperationInFlight {
                entity: "task".to_string(),
                id: task_id.to_string(),
            });
        }
        let value = check(bound)?;
        bound.mutation = MutationState::Pending;

        Ok((MutationGuard { state: &self.state, epoch }, value))
    }

    async fn fetch_task(&self, task_id: &str) -> DomainResult<TaskInstance> {
        self.engine
            .get_task(task_id)
            .await
            .map_err(|e| DomainError::retrieval(format!("task {task_id}"), e.to_string()))
    }

    /// Bind to a task: fetch it with its form, normalize the form and derive
    /// the phase from the assignee. Replaces any previous binding.
    #[instrument(skip(self), fields(actor = %self.actor))]
    pub async fn bind(&self, task_id: &str) -> DomainResult<TaskView> {
        let epoch = {
            let mut state = self.lock();
            state.epoch += 1;
            state.bound = None;
            state.epoch
        };

        let (task, form) = tokio::join!(self.engine.get_task(task_id), self.engine.task_form(task_id));
        let task = task.map_err(|e| DomainError::retrieval(format!("task {task_id}"), e.to_string()))?;
        let raw_form = form.map_err(|e| DomainError::retrieval(format!("form of task {task_id}"), e.to_string()))?;

        let schema = normalize_schema(&raw_form);
        let form = FormState::pristine(schema.initial_data());
        let phase = initial_phase(&task);

        let mut state = self.lock();
        if state.epoch != epoch {
            return Err(DomainError::Discarded {
                entity: "task".to_string(),
                id: task_id.to_string(),
            });
        }
        let bound = state.bound.insert(BoundTask {
            task,
            schema,
            phase,
            form,
            mutation: MutationState::Idle,
        });
        debug!(task_id, phase = %bound.phase, "task bound");
        Ok(bound.view())
    }

    /// Claim the bound task for this controller's actor.
    #[instrument(skip(self), fields(actor = %self.actor))]
    pub async fn claim(&self, task_id: &str) -> DomainResult<TaskView> {
        let actor = self.actor.as_str();
        let (guard, ()) = self.begin_mutation(task_id, |bound| {
            if let Some(holder) = bound.task.assignee.as_deref().filter(|a| *a != actor) {
                return Err(DomainError::Conflict {
                    task_id: task_id.to_string(),
                    message: format!("already claimed by {holder}"),
                });
            }
            if !bound.phase.can_transition_to(TaskPhase::Claimed) {
                return Err(DomainError::InvalidStateTransition {
                    from: bound.phase.to_string(),
                    to: TaskPhase::Claimed.to_string(),
                    reason: format!("task {task_id} can only be claimed while unclaimed"),
                });
            }
            Ok(())
        })?;

        self.engine.claim_task(task_id, actor).await.map_err(|e| match e {
            EngineError::Conflict(_) | EngineError::ClientError { .. } => {
                warn!(task_id, error = %e, "claim refused by engine");
                DomainError::Conflict {
                    task_id: task_id.to_string(),
                    message: e.message().unwrap_or("claimed by another user").to_string(),
                }
            }
            other => {
                warn!(task_id, error = %other, "claim failed");
                DomainError::ClaimFailed {
                    task_id: task_id.to_string(),
                    message: other.to_string(),
                }
            }
        })?;

        let task = self.fetch_task(task_id).await?;
        self.cache.upsert(task.clone()).await;

        let view = self.apply(guard.epoch, task_id, |bound| {
            bound.reconcile(task, actor);
            bound.view()
        })?;
        info!(task_id, phase = %view.phase, "task claimed");
        Ok(view)
    }

    /// Record the editor's form state and recompute submittability.
    pub fn on_form_changed(&self, form: FormState) -> DomainResult<TaskPhase> {
        let mut state = self.lock();
        let bound = state
            .bound
            .as_mut()
            .ok_or_else(|| DomainError::TaskNotBound("form change".to_string()))?;
        bound.form = form;
        bound.recompute(&self.actor);
        Ok(bound.phase)
    }

    /// Submit the current form data.
    ///
    /// Blocked locally, without a request, when the form has errors, the task
    /// is not assigned to the actor, or nothing changed.
    #[instrument(skip(self), fields(actor = %self.actor))]
    pub async fn submit(&self, task_id: &str) -> DomainResult<TaskView> {
        let actor = self.actor.as_str();
        let (guard, data) = self.begin_mutation(task_id, |bound| {
            let blocks = bound.submit_blocks(actor);
            if !blocks.is_empty() {
                return Err(DomainError::NotSubmittable {
                    task_id: task_id.to_string(),
                    blocks,
                });
            }
            if !bound.phase.can_transition_to(TaskPhase::Completed) {
                return Err(DomainError::InvalidStateTransition {
                    from: bound.phase.to_string(),
                    to: TaskPhase::Completed.to_string(),
                    reason: format!("task {task_id} is not submittable"),
                });
            }
            Ok(bound.form.data.clone())
        })?;

        self.engine.submit_task_form(task_id, &data).await.map_err(|e| {
            warn!(task_id, error = %e, "submission rejected");
            DomainError::ValidationError {
                task_id: task_id.to_string(),
                message: e.message().map(str::to_string).unwrap_or_else(|| e.to_string()),
            }
        })?;

        self.cache.remove(task_id).await;

        let view = self.apply(guard.epoch, task_id, |bound| {
            bound.phase = TaskPhase::Completed;
            bound.view()
        })?;
        info!(task_id, "task completed");
        Ok(view)
    }

    /// Refetch the bound task and follow its assignee.
    pub async fn refresh(&self) -> DomainResult<TaskView> {
        let (epoch, task_id) = {
            let state = self.lock();
            let bound = state
                .bound
                .as_ref()
                .ok_or_else(|| DomainError::TaskNotBound("refresh".to_string()))?;
            (state.epoch, bound.task.id.clone())
        };

        let task = self.fetch_task(&task_id).await?;
        self.cache.upsert(task.clone()).await;

        self.apply(epoch, &task_id, |bound| {
            bound.reconcile(task, &self.actor);
            bound.view()
        })
    }

    /// Leave the bound task. Replies still in flight will be discarded.
    pub fn unbind(&self) {
        let mut state = self.lock();
        state.epoch += 1;
        if let Some(bound) = state.bound.take() {
            debug!(task_id = %bound.task.id, "task unbound");
        }
    }
}
