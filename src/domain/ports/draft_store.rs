use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainResult;

/// Working copy of one document for the current session.
///
/// `baseline` is the content last known to be saved on the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftSlot {
    pub session_id: String,
    pub slot: String,
    pub content: String,
    pub baseline: String,
    pub updated_at: DateTime<Utc>,
}

impl DraftSlot {
    /// Content differs from what was last saved.
    pub fn is_dirty(&self) -> bool {
        self.content != self.baseline
    }
}

/// Session-scoped draft storage.
///
/// Implementations are bound to one session; slots of other sessions are
/// never visible.
#[async_trait]
pub trait DraftStore: Send + Sync {
    async fn get(&self, slot: &str) -> DomainResult<Option<DraftSlot>>;

    /// Replace the slot's content. A new slot starts with an empty baseline.
    async fn set(&self, slot: &str, content: &str) -> DomainResult<DraftSlot>;

    /// Record the current content as saved.
    async fn mark_saved(&self, slot: &str) -> DomainResult<DraftSlot>;

    /// Drop the slot. Missing slots are not an error.
    async fn reset(&self, slot: &str) -> DomainResult<()>;

    async fn list(&self) -> DomainResult<Vec<DraftSlot>>;

    async fn is_dirty(&self, slot: &str) -> DomainResult<bool> {
        Ok(self.get(slot).await?.is_some_and(|d| d.is_dirty()))
    }
}
