//! Working copies of workflow documents.
//!
//! The draft slot is the editor's source of truth between saves; the
//! engine's registry holds the last saved version.

use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::workflow::{default_bpmn_template, looks_like_bpmn};
use crate::domain::models::{ConfigEntry, NewWorkflow, WorkflowDocument, WorkflowUpdate};
use crate::domain::ports::{DraftSlot, DraftStore, ProcessEngine};

pub struct DraftService<E: ProcessEngine, D: DraftStore> {
    engine: Arc<E>,
    drafts: Arc<D>,
}

impl<E: ProcessEngine, D: DraftStore> DraftService<E, D> {
    pub fn new(engine: Arc<E>, drafts: Arc<D>) -> Self {
        Self { engine, drafts }
    }

    /// Seed the slot with a document as it exists on the engine.
    async fn seed(&self, document: &WorkflowDocument) -> DomainResult<DraftSlot> {
        self.drafts.set(&document.id, &document.content).await?;
        self.drafts.mark_saved(&document.id).await
    }

    /// Register a new workflow, from imported content or the default
    /// template, and open a draft for it.
    pub async fn create(&self, title: &str, content: Option<String>) -> DomainResult<WorkflowDocument> {
        let content = match content {
            Some(content) if !looks_like_bpmn(&content) => {
                return Err(DomainError::InvalidDocument(format!("{title}: not a BPMN XML file")));
            }
            Some(content) => content,
            None => default_bpmn_template(),
        };

        let document = self
            .engine
            .create_workflow(&NewWorkflow {
                title: title.to_string(),
                content,
            })
            .await
            .map_err(|e| DomainError::retrieval("new workflow", e.to_string()))?;

        self.seed(&document).await?;
        info!(document_id = %document.id, title, "workflow created");
        Ok(document)
    }

    /// The draft for a document, loading it from the engine on first use.
    pub async fn open(&self, document_id: &str) -> DomainResult<DraftSlot> {
        if let Some(slot) = self.drafts.get(document_id).await? {
            return Ok(slot);
        }
        debug!(document_id, "no draft yet; loading from engine");
        let document = self
            .engine
            .get_workflow(document_id)
            .await
            .map_err(|e| DomainError::retrieval(format!("workflow {document_id}"), e.to_string()))?;
        self.seed(&document).await
    }

    /// Replace the draft content without saving it.
    pub async fn edit(&self, document_id: &str, content: &str) -> DomainResult<DraftSlot> {
        self.open(document_id).await?;
        self.drafts.set(document_id, content).await
    }

    /// Throw away unsaved edits.
    pub async fn discard(&self, document_id: &str) -> DomainResult<()> {
        self.drafts.reset(document_id).await
    }

    pub async fn list(&self) -> DomainResult<Vec<DraftSlot>> {
        self.drafts.list().await
    }

    /// Apply manual element configuration on the engine and reload the
    /// rewritten document into the draft.
    pub async fn configure(&self, document_id: &str, entries: Vec<ConfigEntry>) -> DomainResult<WorkflowDocument> {
        if self.drafts.is_dirty(document_id).await? {
            return Err(DomainError::InvalidStateTransition {
                from: "dirty".to_string(),
                to: "configured".to_string(),
                reason: format!("workflow {document_id} has unsaved edits; deploy or discard them first"),
            });
        }

        let document = self
            .engine
            .update_workflow(document_id, &WorkflowUpdate::config(entries))
            .await
            .map_err(|e| DomainError::retrieval(format!("workflow {document_id}"), e.to_string()))?;

        self.seed(&document).await?;
        Ok(document)
    }

    /// Delete the workflow from the registry along with its draft.
    pub async fn delete(&self, document_id: &str) -> DomainResult<()> {
        self.engine
            .delete_workflow(document_id)
            .await
            .map_err(|e| DomainError::retrieval(format!("workflow {document_id}"), e.to_string()))?;
        self.drafts.reset(document_id).await
    }
}
