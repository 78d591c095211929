//! Remote gateway repair.
//!
//! The engine can rewire gateway flows itself. This service only triggers
//! that repair and brings the corrected document back into the draft; when
//! a repair may be offered is decided here too, but the decision to apply
//! one always belongs to the caller holding an [`AutoFixOffer`].

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::defect::ReadinessVerdict;
use crate::domain::models::deployment::{AutoFixOffer, AutoFixReason, AutoFixTrigger};
use crate::domain::models::WorkflowDocument;
use crate::domain::ports::{DraftStore, ProcessEngine};

pub struct AutoFixService<E: ProcessEngine, D: DraftStore> {
    engine: Arc<E>,
    drafts: Arc<D>,
}

impl<E: ProcessEngine, D: DraftStore> AutoFixService<E, D> {
    pub fn new(engine: Arc<E>, drafts: Arc<D>) -> Self {
        Self { engine, drafts }
    }

    /// Run the engine-side repair, re-fetch the corrected document and write
    /// its content back into the draft as saved.
    ///
    /// Any failure is final: nothing is retried and nothing is deployed.
    pub async fn auto_fix(&self, document_id: &str) -> DomainResult<WorkflowDocument> {
        let failed = |message: String| DomainError::AutoFixFailed {
            document_id: document_id.to_string(),
            message,
        };

        self.engine.auto_fix_gateway_flows(document_id).await.map_err(|e| {
            warn!(document_id, error = %e, "auto-fix rejected by engine");
            failed(e.to_string())
        })?;

        let document = self
            .engine
            .get_workflow(document_id)
            .await
            .map_err(|e| failed(format!("could not re-fetch corrected workflow: {e}")))?;

        self.drafts.set(document_id, &document.content).await?;
        self.drafts.mark_saved(document_id).await?;

        info!(document_id, "auto-fix applied");
        Ok(document)
    }
}

/// Offer a repair for a failed readiness check: only connectivity defects
/// are within reach of the engine's repair.
pub(crate) fn offer_for_verdict(document_id: &str, verdict: &ReadinessVerdict) -> Option<AutoFixOffer> {
    verdict
        .has_connectivity_defect()
        .then(|| AutoFixOffer::new(document_id, AutoFixReason::ConnectivityDefect))
}

/// Offer a repair for a client-error deploy rejection, subject to the trigger.
pub(crate) fn offer_for_rejection(
    document_id: &str,
    message: &str,
    trigger: AutoFixTrigger,
) -> Option<AutoFixOffer> {
    trigger
        .offers_for(message)
        .then(|| AutoFixOffer::new(document_id, AutoFixReason::DeployRejected))
}
