//! Wiring of adapters into services for one CLI invocation.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::adapters::engine::{EngineClientConfig, HttpProcessEngine};
use crate::adapters::sqlite::{initialize_database, SqliteDraftStore};
use crate::domain::models::Config;
use crate::services::{DeploymentOrchestrator, DraftService, TaskLifecycleController};

pub struct AppContext {
    pub config: Config,
    pub engine: Arc<HttpProcessEngine>,
    pub drafts: Arc<SqliteDraftStore>,
}

impl AppContext {
    pub async fn connect(config: Config) -> Result<Self> {
        let engine = HttpProcessEngine::new(EngineClientConfig::from(&config.engine))
            .context("Failed to build process engine client")?;
        let pool = initialize_database(&config.drafts)
            .await
            .with_context(|| format!("Failed to open draft database at {}", config.drafts.path))?;
        let drafts = SqliteDraftStore::new(pool, config.drafts.session_id.clone());

        Ok(Self {
            config,
            engine: Arc::new(engine),
            drafts: Arc::new(drafts),
        })
    }

    pub fn draft_service(&self) -> DraftService<HttpProcessEngine, SqliteDraftStore> {
        DraftService::new(self.engine.clone(), self.drafts.clone())
    }

    pub fn orchestrator(&self) -> DeploymentOrchestrator<HttpProcessEngine, SqliteDraftStore> {
        DeploymentOrchestrator::new(self.engine.clone(), self.drafts.clone())
            .with_trigger(self.config.deploy.auto_fix_trigger)
    }

    /// Controller for `actor`, falling back to `tasks.actor` from config.
    pub fn task_controller(&self, actor: Option<String>) -> Result<TaskLifecycleController<HttpProcessEngine>> {
        let actor = actor
            .or_else(|| self.config.tasks.actor.clone())
            .filter(|a| !a.trim().is_empty())
            .context("No actor given: pass --as <USER> or set tasks.actor (FLOWGATE_TASKS__ACTOR)")?;
        Ok(TaskLifecycleController::new(self.engine.clone(), actor))
    }
}
