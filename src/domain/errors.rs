//! Domain errors for the flowgate deploy and task-lifecycle core.

use thiserror::Error;

use super::models::task::SubmitBlock;

/// Format the reasons a submission was blocked: `errors present, no changes`.
fn format_blocks(blocks: &[SubmitBlock]) -> String {
    blocks
        .iter()
        .map(|b| b.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Domain-level errors surfaced to the user.
///
/// None of these are retried automatically. Variants raised for local
/// invariant violations (`OperationInFlight`, `NotSubmittable`,
/// `InvalidStateTransition`) are produced before any request is sent.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The engine could not produce a graph, form, task or document.
    #[error("Could not retrieve {what}: {message}")]
    Retrieval { what: String, message: String },

    /// The engine refused the deployment and auto-fix is not applicable.
    #[error("Deployment rejected: {message}")]
    DeployRejected { message: String },

    #[error("Deployment failed: {0}")]
    DeployFailed(String),

    #[error("Auto-fix failed for workflow {document_id}: {message}")]
    AutoFixFailed { document_id: String, message: String },

    /// Claim race: the task is owned by someone else.
    #[error("Task {task_id} is already claimed: {message}")]
    Conflict { task_id: String, message: String },

    /// The engine failed the claim for a reason other than ownership.
    #[error("Failed to claim task {task_id}: {message}")]
    ClaimFailed { task_id: String, message: String },

    /// The engine rejected the submitted form data.
    #[error("Task {task_id} submission rejected: {message}")]
    ValidationError { task_id: String, message: String },

    #[error("Task {task_id} is not submittable: {}", format_blocks(.blocks))]
    NotSubmittable { task_id: String, blocks: Vec<SubmitBlock> },

    #[error("Invalid state transition from {from} to {to}: {reason}")]
    InvalidStateTransition { from: String, to: String, reason: String },

    #[error("Another operation is already in flight for {entity} {id}")]
    OperationInFlight { entity: String, id: String },

    /// A response arrived after the controller was rebound or unbound.
    #[error("Result for {entity} {id} discarded: no longer bound")]
    Discarded { entity: String, id: String },

    #[error("No task is bound to this controller (requested {0})")]
    TaskNotBound(String),

    /// Imported content is not a BPMN document.
    #[error("Invalid workflow document: {0}")]
    InvalidDocument(String),

    #[error("Draft slot not found: {0}")]
    DraftNotFound(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    /// Build a retrieval error for the given subject.
    pub fn retrieval(what: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Retrieval {
            what: what.into(),
            message: message.into(),
        }
    }

    /// Whether the error was raised locally without contacting the engine.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::NotSubmittable { .. }
                | Self::InvalidStateTransition { .. }
                | Self::OperationInFlight { .. }
                | Self::TaskNotBound(_)
                | Self::InvalidDocument(_)
        )
    }
}

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}
