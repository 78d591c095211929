//! Mock process engine for testing.
//!
//! Holds workflows, graphs and tasks in memory and behaves like the real
//! engine for the operations the services use: claims conflict when someone
//! else holds the task, submissions complete it, auto-fix swaps in a
//! prepared graph. Every call is logged, failures can be injected per
//! operation, and operations can be held at a gate so tests can observe
//! in-flight state.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, Semaphore};

use crate::domain::models::{
    DeployableUnit, GraphListing, NewWorkflow, ProcessDefinition, TaskInstance, WorkflowDocument,
    WorkflowUpdate,
};
use crate::domain::ports::errors::{EngineError, EngineResult};
use crate::domain::ports::process_engine::ProcessEngine;

/// Injected failure for one operation.
#[derive(Debug, Clone)]
pub enum MockFailure {
    /// Reply with this HTTP status and body
    Status(u16, String),
    /// Fail before any reply
    Network(String),
}

impl MockFailure {
    fn to_error(&self) -> EngineError {
        match self {
            Self::Status(status, body) => EngineError::from_status(*status, body.clone()),
            Self::Network(msg) => EngineError::Network(msg.clone()),
        }
    }
}

/// A recorded call: operation name plus its main argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub op: &'static str,
    pub target: String,
}

#[derive(Default)]
struct MockState {
    workflows: HashMap<String, WorkflowDocument>,
    graphs: HashMap<String, GraphListing>,
    fixed_graphs: HashMap<String, GraphListing>,
    tasks: HashMap<String, TaskInstance>,
    forms: HashMap<String, Value>,
    processes: Vec<ProcessDefinition>,
    deployed: Vec<DeployableUnit>,
    submissions: Vec<(String, Value)>,
    failures: HashMap<&'static str, MockFailure>,
    calls: Vec<MockCall>,
}

/// Mock process engine for testing.
#[derive(Clone, Default)]
pub struct MockProcessEngine {
    state: Arc<RwLock<MockState>>,
    gates: Arc<RwLock<HashMap<&'static str, Arc<Semaphore>>>>,
}

impl MockProcessEngine {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Setup ───────────────────────────────────────────────────────────

    pub async fn add_workflow(&self, document: WorkflowDocument) {
        let mut state = self.state.write().await;
        state.workflows.insert(document.id.clone(), document);
    }

    pub async fn set_graph(&self, workflow_id: &str, graph: GraphListing) {
        let mut state = self.state.write().await;
        state.graphs.insert(workflow_id.to_string(), graph);
    }

    /// Graph the workflow will have after a successful auto-fix.
    pub async fn set_fixed_graph(&self, workflow_id: &str, graph: GraphListing) {
        let mut state = self.state.write().await;
        state.fixed_graphs.insert(workflow_id.to_string(), graph);
    }

    pub async fn add_task(&self, task: TaskInstance, form: Value) {
        let mut state = self.state.write().await;
        state.forms.insert(task.id.clone(), form);
        state.tasks.insert(task.id.clone(), task);
    }

    pub async fn add_process(&self, process: ProcessDefinition) {
        self.state.write().await.processes.push(process);
    }

    /// Make every call of `op` fail until cleared.
    pub async fn fail(&self, op: &'static str, failure: MockFailure) {
        self.state.write().await.failures.insert(op, failure);
    }

    pub async fn clear_failure(&self, op: &'static str) {
        self.state.write().await.failures.remove(op);
    }

    /// Hold every call of `op` until the returned semaphore gets a permit.
    /// The call is recorded before it waits.
    pub async fn hold(&self, op: &'static str) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.gates.write().await.insert(op, gate.clone());
        gate
    }

    // ── Inspection ──────────────────────────────────────────────────────

    pub async fn calls(&self) -> Vec<MockCall> {
        self.state.read().await.calls.clone()
    }

    pub async fn call_count(&self, op: &str) -> usize {
        self.state.read().await.calls.iter().filter(|c| c.op == op).count()
    }

    pub async fn deployed(&self) -> Vec<DeployableUnit> {
        self.state.read().await.deployed.clone()
    }

    pub async fn submissions(&self) -> Vec<(String, Value)> {
        self.state.read().await.submissions.clone()
    }

    pub async fn workflow(&self, id: &str) -> Option<WorkflowDocument> {
        self.state.read().await.workflows.get(id).cloned()
    }

    pub async fn task(&self, id: &str) -> Option<TaskInstance> {
        self.state.read().await.tasks.get(id).cloned()
    }

    /// Assign a task behind the client's back.
    pub async fn set_assignee(&self, task_id: &str, assignee: Option<&str>) {
        if let Some(task) = self.state.write().await.tasks.get_mut(task_id) {
            task.assignee = assignee.map(str::to_string);
        }
    }

    // ── Internals ───────────────────────────────────────────────────────

    /// Record the call, wait at its gate, then apply any injected failure.
    async fn enter(&self, op: &'static str, target: &str) -> EngineResult<()> {
        self.state.write().await.calls.push(MockCall {
            op,
            target: target.to_string(),
        });

        let gate = self.gates.read().await.get(op).cloned();
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        match self.state.read().await.failures.get(op) {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }

    fn not_found(what: &str, id: &str) -> EngineError {
        EngineError::NotFound(format!("{what} not found with ID: {id}"))
    }
}

#[async_trait]
impl ProcessEngine for MockProcessEngine {
    async fn list_workflows(&self) -> EngineResult<Vec<WorkflowDocument>> {
        self.enter("list_workflows", "").await?;
        let mut workflows: Vec<_> = self.state.read().await.workflows.values().cloned().collect();
        workflows.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(workflows)
    }

    async fn get_workflow(&self, id: &str) -> EngineResult<WorkflowDocument> {
        self.enter("get_workflow", id).await?;
        self.state
            .read()
            .await
            .workflows
            .get(id)
            .cloned()
            .ok_or_else(|| Self::not_found("Workflow", id))
    }

    async fn create_workflow(&self, workflow: &NewWorkflow) -> EngineResult<WorkflowDocument> {
        self.enter("create_workflow", &workflow.title).await?;
        let now = Utc::now();
        let document = WorkflowDocument {
            id: uuid::Uuid::new_v4().to_string(),
            title: workflow.title.clone(),
            content: workflow.content.clone(),
            creation_time: now,
            update_time: now,
            ready_to_deploy: false,
        };
        self.add_workflow(document.clone()).await;
        Ok(document)
    }

    async fn update_workflow(&self, id: &str, update: &WorkflowUpdate) -> EngineResult<WorkflowDocument> {
        self.enter("update_workflow", id).await?;
        let mut state = self.state.write().await;
        let document = state
            .workflows
            .get_mut(id)
            .ok_or_else(|| Self::not_found("Workflow", id))?;
        if let Some(title) = &update.title {
            document.title = title.clone();
        }
        if let Some(content) = &update.content {
            document.content = content.clone();
        }
        document.update_time = Utc::now();
        Ok(document.clone())
    }

    async fn delete_workflow(&self, id: &str) -> EngineResult<()> {
        self.enter("delete_workflow", id).await?;
        let mut state = self.state.write().await;
        state.graphs.remove(id);
        state
            .workflows
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Self::not_found("Workflow", id))
    }

    async fn workflow_graph(&self, id: &str) -> EngineResult<GraphListing> {
        self.enter("workflow_graph", id).await?;
        let state = self.state.read().await;
        if !state.workflows.contains_key(id) {
            return Err(Self::not_found("Workflow", id));
        }
        Ok(state.graphs.get(id).cloned().unwrap_or_default())
    }

    async fn auto_fix_gateway_flows(&self, id: &str) -> EngineResult<()> {
        self.enter("auto_fix", id).await?;
        let mut state = self.state.write().await;
        let document = state
            .workflows
            .get_mut(id)
            .ok_or_else(|| Self::not_found("Workflow", id))?;
        document.content.push_str("\n<!-- gateway flows repaired -->");
        document.update_time = Utc::now();
        if let Some(fixed) = state.fixed_graphs.remove(id) {
            state.graphs.insert(id.to_string(), fixed);
        }
        Ok(())
    }

    async fn deploy(&self, unit: &DeployableUnit) -> EngineResult<String> {
        self.enter("deploy", &unit.file_name).await?;
        let key = unit.file_name.trim_end_matches(".bpmn").to_string();
        self.state.write().await.deployed.push(unit.clone());
        Ok(key)
    }

    async fn list_processes(&self) -> EngineResult<Vec<ProcessDefinition>> {
        self.enter("list_processes", "").await?;
        Ok(self.state.read().await.processes.clone())
    }

    async fn start_process(&self, process_key: &str) -> EngineResult<String> {
        self.enter("start_process", process_key).await?;
        let known = self.state.read().await.processes.iter().any(|p| p.key == process_key);
        if !known {
            return Err(Self::not_found("Process", process_key));
        }
        Ok(format!("Process started with key: {process_key}"))
    }

    async fn list_tasks(&self) -> EngineResult<Vec<TaskInstance>> {
        self.enter("list_tasks", "").await?;
        let mut tasks: Vec<_> = self.state.read().await.tasks.values().cloned().collect();
        tasks.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(tasks)
    }

    async fn get_task(&self, task_id: &str) -> EngineResult<TaskInstance> {
        self.enter("get_task", task_id).await?;
        self.state
            .read()
            .await
            .tasks
            .get(task_id)
            .cloned()
            .ok_or_else(|| Self::not_found("Task", task_id))
    }

    async fn task_form(&self, task_id: &str) -> EngineResult<Value> {
        self.enter("task_form", task_id).await?;
        let state = self.state.read().await;
        if !state.tasks.contains_key(task_id) {
            return Err(Self::not_found("Task", task_id));
        }
        Ok(state.forms.get(task_id).cloned().unwrap_or(Value::Null))
    }

    async fn claim_task(&self, task_id: &str, user_id: &str) -> EngineResult<()> {
        self.enter("claim_task", task_id).await?;
        let mut state = self.state.write().await;
        let task = state
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| Self::not_found("Task", task_id))?;
        if let Some(current) = task.assignee.as_deref().filter(|a| *a != user_id) {
            return Err(EngineError::Conflict(format!(
                "Task {task_id} is already claimed by {current}"
            )));
        }
        task.assignee = Some(user_id.to_string());
        Ok(())
    }

    async fn submit_task_form(&self, task_id: &str, data: &Value) -> EngineResult<()> {
        self.enter("submit_task_form", task_id).await?;
        let mut state = self.state.write().await;
        if state.tasks.remove(task_id).is_none() {
            return Err(Self::not_found("Task", task_id));
        }
        state.forms.remove(task_id);
        state.submissions.push((task_id.to_string(), data.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_claim_conflicts_with_other_assignee() {
        let engine = MockProcessEngine::new();
        engine.add_task(TaskInstance::new("T1", "Approve"), Value::Null).await;

        engine.claim_task("T1", "alice").await.unwrap();
        engine.claim_task("T1", "alice").await.unwrap();
        let err = engine.claim_task("T1", "bob").await.unwrap_err();
        assert!(matches!(err, EngineError::Conflict(_)));
        assert_eq!(engine.task("T1").await.unwrap().assignee.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_injected_failure_is_logged() {
        let engine = MockProcessEngine::new();
        engine.fail("list_tasks", MockFailure::Status(500, "boom".to_string())).await;

        assert!(engine.list_tasks().await.is_err());
        assert_eq!(engine.call_count("list_tasks").await, 1);

        engine.clear_failure("list_tasks").await;
        assert!(engine.list_tasks().await.unwrap().is_empty());
    }
}
