//! Save, validate, repair on demand, package and deploy.
//!
//! Each document carries a phase tag. While the tag is pending (validating,
//! deploying, auto-fixing) any further operation on the same document is
//! refused before a request is sent. Tags are held by a guard: if the
//! operation's future is dropped mid-flight the tag falls back to where it
//! started.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{info, instrument, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::defect::{ConfigurationAdvisory, ReadinessVerdict};
use crate::domain::models::deployment::{
    AutoFixOffer, AutoFixTrigger, DeployOutcome, DeployPhase, DEFAULT_REJECTION_MESSAGE,
};
use crate::domain::models::{WorkflowDocument, WorkflowUpdate};
use crate::domain::ports::{DraftStore, EngineError, ProcessEngine};
use crate::services::auto_fix::{offer_for_rejection, offer_for_verdict, AutoFixService};
use crate::services::graph_extractor::GraphExtractor;
use crate::services::readiness_validator::ReadinessValidator;

type PhaseMap = Arc<Mutex<HashMap<String, DeployPhase>>>;

fn lock(phases: &PhaseMap) -> std::sync::MutexGuard<'_, HashMap<String, DeployPhase>> {
    phases.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Holds a document's pending tag for the length of one operation.
struct PhaseGuard {
    phases: PhaseMap,
    document_id: String,
    fallback: DeployPhase,
    settled: bool,
}

impl PhaseGuard {
    fn advance(&self, phase: DeployPhase) {
        lock(&self.phases).insert(self.document_id.clone(), phase);
    }

    fn settle(mut self, phase: DeployPhase) {
        self.advance(phase);
        self.settled = true;
    }
}

impl Drop for PhaseGuard {
    fn drop(&mut self) {
        if !self.settled {
            lock(&self.phases).insert(self.document_id.clone(), self.fallback);
        }
    }
}

pub struct DeploymentOrchestrator<E: ProcessEngine, D: DraftStore> {
    engine: Arc<E>,
    drafts: Arc<D>,
    extractor: GraphExtractor<E>,
    validator: ReadinessValidator,
    auto_fixer: AutoFixService<E, D>,
    trigger: AutoFixTrigger,
    phases: PhaseMap,
}

impl<E: ProcessEngine, D: DraftStore> DeploymentOrchestrator<E, D> {
    pub fn new(engine: Arc<E>, drafts: Arc<D>) -> Self {
        Self {
            extractor: GraphExtractor::new(engine.clone()),
            validator: ReadinessValidator::new(),
            auto_fixer: AutoFixService::new(engine.clone(), drafts.clone()),
            engine,
            drafts,
            trigger: AutoFixTrigger::default(),
            phases: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn with_trigger(mut self, trigger: AutoFixTrigger) -> Self {
        self.trigger = trigger;
        self
    }

    /// Current phase; documents never touched are drafts.
    pub fn phase(&self, document_id: &str) -> DeployPhase {
        lock(&self.phases).get(document_id).copied().unwrap_or_default()
    }

    /// Move the document into `pending`, refusing if something is already in
    /// flight or the move is not a valid transition.
    fn begin(&self, document_id: &str, pending: DeployPhase, fallback: Option<DeployPhase>) -> DomainResult<PhaseGuard> {
        let mut phases = lock(&self.phases);
        let current = phases.get(document_id).copied().unwrap_or_default();

        if current.is_pending() {
            return Err(DomainError::OperationInFlight {
                entity: "workflow".to_string(),
                id: document_id.to_string(),
            });
        }

        // Starting over from any settled phase goes through Draft.
        let from = if pending == DeployPhase::Validating { DeployPhase::Draft } else { current };
        if !from.can_transition_to(pending) {
            return Err(DomainError::InvalidStateTransition {
                from: current.to_string(),
                to: pending.to_string(),
                reason: format!("workflow {document_id} has no pending auto-fix decision"),
            });
        }

        phases.insert(document_id.to_string(), pending);
        Ok(PhaseGuard {
            phases: self.phases.clone(),
            document_id: document_id.to_string(),
            fallback: fallback.unwrap_or(current),
            settled: false,
        })
    }

    /// Write the editor content to the draft, push it to the registry and
    /// mark the draft saved.
    async fn save(&self, document_id: &str, editor_content: &str) -> DomainResult<WorkflowDocument> {
        self.drafts.set(document_id, editor_content).await?;

        let document = self
            .engine
            .update_workflow(document_id, &WorkflowUpdate::content(editor_content))
            .await
            .map_err(|e| DomainError::DeployFailed(format!("could not save workflow {document_id}: {e}")))?;

        self.drafts.mark_saved(document_id).await?;
        Ok(document)
    }

    /// Fresh graph from the engine, checked now.
    async fn check(&self, document_id: &str) -> DomainResult<ReadinessVerdict> {
        let graph = self.extractor.extract(document_id).await?;
        Ok(self.validator.verdict(&graph))
    }

    /// Save, validate and, if ready, deploy.
    ///
    /// The deploy endpoint is contacted only after a fresh check found no
    /// defects.
    #[instrument(skip(self, editor_content))]
    pub async fn deploy(&self, document_id: &str, editor_content: &str) -> DomainResult<DeployOutcome> {
        let guard = self.begin(document_id, DeployPhase::Validating, Some(DeployPhase::Draft))?;

        let document = self.save(document_id, editor_content).await?;
        let verdict = self.check(document_id).await?;

        if document.ready_to_deploy != verdict.is_ready() {
            warn!(
                document_id,
                cached = document.ready_to_deploy,
                fresh = verdict.is_ready(),
                "cached readiness flag disagrees with fresh check"
            );
        }

        if !verdict.is_ready() {
            info!(document_id, defects = verdict.defects.len(), "workflow not ready to deploy");
            let auto_fix = offer_for_verdict(document_id, &verdict);
            guard.settle(DeployPhase::NotReady);
            return Ok(DeployOutcome::NotReady {
                defects: verdict.defects,
                auto_fix,
            });
        }

        guard.advance(DeployPhase::Deploying);
        let unit = document.package();

        match self.engine.deploy(&unit).await {
            Ok(process_id) => {
                info!(document_id, %process_id, file = %unit.file_name, "workflow deployed");
                guard.settle(DeployPhase::Deployed);
                Ok(DeployOutcome::Deployed { process_id })
            }
            Err(EngineError::ClientError { message }) => {
                let message = message.unwrap_or_else(|| DEFAULT_REJECTION_MESSAGE.to_string());
                warn!(document_id, %message, "deployment rejected");
                let auto_fix = offer_for_rejection(document_id, &message, self.trigger);
                guard.settle(DeployPhase::DeployRejected);
                Ok(DeployOutcome::Rejected { message, auto_fix })
            }
            Err(e) => Err(DomainError::DeployFailed(e.to_string())),
        }
    }

    /// Recompute readiness without deploying.
    pub async fn validate(&self, document_id: &str) -> DomainResult<ReadinessVerdict> {
        let guard = self.begin(document_id, DeployPhase::Validating, None)?;
        let verdict = self.check(document_id).await?;
        guard.settle(if verdict.is_ready() { DeployPhase::Ready } else { DeployPhase::NotReady });
        Ok(verdict)
    }

    /// Non-blocking configuration advisories for the current engine graph.
    pub async fn advise(&self, document_id: &str) -> DomainResult<Vec<ConfigurationAdvisory>> {
        let graph = self.extractor.extract(document_id).await?;
        Ok(self.validator.advise(&graph))
    }

    /// Run the remote repair the offer allows, then re-check. Never deploys.
    #[instrument(skip(self, offer), fields(document_id = %offer.document_id()))]
    pub async fn apply_auto_fix(&self, offer: AutoFixOffer) -> DomainResult<ReadinessVerdict> {
        let document_id = offer.document_id();
        let guard = self.begin(document_id, DeployPhase::AutoFixing, None)?;

        self.auto_fixer.auto_fix(document_id).await?;

        guard.advance(DeployPhase::Validating);
        let verdict = self.check(document_id).await?;
        guard.settle(if verdict.is_ready() { DeployPhase::Ready } else { DeployPhase::NotReady });
        Ok(verdict)
    }

    /// Give up on the current attempt and return the document to Draft.
    pub fn abandon(&self, document_id: &str) -> DomainResult<DeployPhase> {
        let mut phases = lock(&self.phases);
        let current = phases.get(document_id).copied().unwrap_or_default();
        if current.is_pending() {
            return Err(DomainError::OperationInFlight {
                entity: "workflow".to_string(),
                id: document_id.to_string(),
            });
        }
        phases.remove(document_id);
        Ok(current)
    }
}
