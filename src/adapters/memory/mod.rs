//! In-memory draft store.
//!
//! Used by tests and by one-shot CLI runs that should leave no state behind.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::draft_store::{DraftSlot, DraftStore};

#[derive(Clone)]
pub struct InMemoryDraftStore {
    session_id: String,
    slots: Arc<RwLock<HashMap<String, DraftSlot>>>,
}

impl InMemoryDraftStore {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            slots: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryDraftStore {
    fn default() -> Self {
        Self::new("default")
    }
}

#[async_trait]
impl DraftStore for InMemoryDraftStore {
    async fn get(&self, slot: &str) -> DomainResult<Option<DraftSlot>> {
        Ok(self.slots.read().await.get(slot).cloned())
    }

    async fn set(&self, slot: &str, content: &str) -> DomainResult<DraftSlot> {
        let mut slots = self.slots.write().await;
        let entry = slots.entry(slot.to_string()).or_insert_with(|| DraftSlot {
            session_id: self.session_id.clone(),
            slot: slot.to_string(),
            content: String::new(),
            baseline: String::new(),
            updated_at: Utc::now(),
        });
        entry.content = content.to_string();
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    async fn mark_saved(&self, slot: &str) -> DomainResult<DraftSlot> {
        let mut slots = self.slots.write().await;
        let entry = slots
            .get_mut(slot)
            .ok_or_else(|| DomainError::DraftNotFound(slot.to_string()))?;
        entry.baseline = entry.content.clone();
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    async fn reset(&self, slot: &str) -> DomainResult<()> {
        self.slots.write().await.remove(slot);
        Ok(())
    }

    async fn list(&self) -> DomainResult<Vec<DraftSlot>> {
        let mut slots: Vec<_> = self.slots.read().await.values().cloned().collect();
        slots.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.slot.cmp(&b.slot)));
        Ok(slots)
    }
}
