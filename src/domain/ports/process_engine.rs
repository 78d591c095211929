use async_trait::async_trait;
use serde_json::Value;

use crate::domain::models::{
    DeployableUnit, GraphListing, NewWorkflow, ProcessDefinition, TaskInstance, WorkflowDocument,
    WorkflowUpdate,
};
use crate::domain::ports::errors::EngineResult;

/// Port for the remote process engine.
///
/// Every call is a single request. Adapters never retry; callers decide what
/// a failure means.
#[async_trait]
pub trait ProcessEngine: Send + Sync {
    // ── Workflow registry ───────────────────────────────────────────────

    async fn list_workflows(&self) -> EngineResult<Vec<WorkflowDocument>>;

    async fn get_workflow(&self, id: &str) -> EngineResult<WorkflowDocument>;

    async fn create_workflow(&self, workflow: &NewWorkflow) -> EngineResult<WorkflowDocument>;

    /// Partial update: content, title or element configuration.
    async fn update_workflow(&self, id: &str, update: &WorkflowUpdate) -> EngineResult<WorkflowDocument>;

    async fn delete_workflow(&self, id: &str) -> EngineResult<()>;

    /// Structural listing of the workflow's tasks and gateways.
    async fn workflow_graph(&self, id: &str) -> EngineResult<GraphListing>;

    /// Ask the engine to repair gateway flows in place.
    async fn auto_fix_gateway_flows(&self, id: &str) -> EngineResult<()>;

    // ── Deployment and processes ────────────────────────────────────────

    /// Deploy a packaged workflow. Returns the deployed process key.
    async fn deploy(&self, unit: &DeployableUnit) -> EngineResult<String>;

    async fn list_processes(&self) -> EngineResult<Vec<ProcessDefinition>>;

    /// Start a process instance by definition key. Returns the engine's reply.
    async fn start_process(&self, process_key: &str) -> EngineResult<String>;

    // ── Human tasks ─────────────────────────────────────────────────────

    async fn list_tasks(&self) -> EngineResult<Vec<TaskInstance>>;

    async fn get_task(&self, task_id: &str) -> EngineResult<TaskInstance>;

    /// Raw form schema attached to the task; may be `null`.
    async fn task_form(&self, task_id: &str) -> EngineResult<Value>;

    async fn claim_task(&self, task_id: &str, user_id: &str) -> EngineResult<()>;

    async fn submit_task_form(&self, task_id: &str, data: &Value) -> EngineResult<()>;
}
