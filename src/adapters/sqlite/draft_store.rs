//! SQLite implementation of the DraftStore.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use super::parse_datetime;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::draft_store::{DraftSlot, DraftStore};

#[derive(Clone)]
pub struct SqliteDraftStore {
    pool: SqlitePool,
    session_id: String,
}

impl SqliteDraftStore {
    pub fn new(pool: SqlitePool, session_id: impl Into<String>) -> Self {
        Self {
            pool,
            session_id: session_id.into(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

#[derive(sqlx::FromRow)]
struct DraftRow {
    session_id: String,
    slot: String,
    content: String,
    baseline: String,
    updated_at: String,
}

impl DraftRow {
    fn into_slot(self) -> DomainResult<DraftSlot> {
        Ok(DraftSlot {
            session_id: self.session_id,
            slot: self.slot,
            content: self.content,
            baseline: self.baseline,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

#[async_trait]
impl DraftStore for SqliteDraftStore {
    async fn get(&self, slot: &str) -> DomainResult<Option<DraftSlot>> {
        let row: Option<DraftRow> = sqlx::query_as(
            "SELECT session_id, slot, content, baseline, updated_at
             FROM draft_slots WHERE session_id = ? AND slot = ?",
        )
        .bind(&self.session_id)
        .bind(slot)
        .fetch_optional(&self.pool)
        .await?;

        row.map(DraftRow::into_slot).transpose()
    }

    async fn set(&self, slot: &str, content: &str) -> DomainResult<DraftSlot> {
        sqlx::query(
            "INSERT INTO draft_slots (session_id, slot, content, baseline, updated_at)
             VALUES (?, ?, ?, '', ?)
             ON CONFLICT (session_id, slot)
             DO UPDATE SET content = excluded.content, updated_at = excluded.updated_at",
        )
        .bind(&self.session_id)
        .bind(slot)
        .bind(content)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        self.get(slot)
            .await?
            .ok_or_else(|| DomainError::DraftNotFound(slot.to_string()))
    }

    async fn mark_saved(&self, slot: &str) -> DomainResult<DraftSlot> {
        let result = sqlx::query(
            "UPDATE draft_slots SET baseline = content, updated_at = ?
             WHERE session_id = ? AND slot = ?",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(&self.session_id)
        .bind(slot)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::DraftNotFound(slot.to_string()));
        }

        self.get(slot)
            .await?
            .ok_or_else(|| DomainError::DraftNotFound(slot.to_string()))
    }

    async fn reset(&self, slot: &str) -> DomainResult<()> {
        sqlx::query("DELETE FROM draft_slots WHERE session_id = ? AND slot = ?")
            .bind(&self.session_id)
            .bind(slot)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list(&self) -> DomainResult<Vec<DraftSlot>> {
        let rows: Vec<DraftRow> = sqlx::query_as(
            "SELECT session_id, slot, content, baseline, updated_at
             FROM draft_slots WHERE session_id = ? ORDER BY updated_at DESC, slot",
        )
        .bind(&self.session_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(DraftRow::into_slot).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;

    #[tokio::test]
    async fn test_set_then_mark_saved_clears_dirty() {
        let pool = create_migrated_test_pool().await.unwrap();
        let store = SqliteDraftStore::new(pool, "s1");

        let slot = store.set("wf-1", "<a/>").await.unwrap();
        assert!(slot.is_dirty());
        assert_eq!(slot.baseline, "");

        let slot = store.mark_saved("wf-1").await.unwrap();
        assert!(!slot.is_dirty());

        store.set("wf-1", "<b/>").await.unwrap();
        assert!(store.is_dirty("wf-1").await.unwrap());
        assert_eq!(store.get("wf-1").await.unwrap().unwrap().baseline, "<a/>");
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let pool = create_migrated_test_pool().await.unwrap();
        let alice = SqliteDraftStore::new(pool.clone(), "alice");
        let bob = SqliteDraftStore::new(pool, "bob");

        alice.set("wf-1", "<a/>").await.unwrap();
        assert!(bob.get("wf-1").await.unwrap().is_none());
        assert_eq!(alice.list().await.unwrap().len(), 1);
        assert!(bob.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mark_saved_missing_slot() {
        let pool = create_migrated_test_pool().await.unwrap();
        let store = SqliteDraftStore::new(pool, "s1");
        let err = store.mark_saved("nope").await.unwrap_err();
        assert!(matches!(err, DomainError::DraftNotFound(_)));
        store.reset("nope").await.unwrap();
    }
}
