//! HTTP process engine client.
//!
//! Talks to two bases: the API gateway (workflow registry, deployment,
//! claims, task listing, forms) and the engine itself (task lookup, form
//! submission). Requests are sent once; failures are classified by status and
//! handed back to the caller.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::multipart::{Form, Part};
use reqwest::{header, Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::domain::models::{
    DeployableUnit, EngineConfig, GraphListing, NewWorkflow, ProcessDefinition, TaskInstance,
    WorkflowDocument, WorkflowUpdate,
};
use crate::domain::ports::errors::{EngineError, EngineResult};
use crate::domain::ports::process_engine::ProcessEngine;
use crate::infrastructure::logging::scrub_secrets;

/// Connection settings for [`HttpProcessEngine`].
#[derive(Debug, Clone)]
pub struct EngineClientConfig {
    pub gateway_url: String,
    pub engine_url: String,
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for EngineClientConfig {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for EngineClientConfig {
    fn from(config: &EngineConfig) -> Self {
        Self {
            gateway_url: config.gateway_url.trim_end_matches('/').to_string(),
            engine_url: config.engine_url.trim_end_matches('/').to_string(),
            token: config.token.clone().filter(|t| !t.trim().is_empty()),
            timeout_secs: config.timeout_secs,
        }
    }
}

impl EngineClientConfig {
    /// Point both bases at one server. Handy for HTTP mocks.
    pub fn single_base(url: impl Into<String>) -> Self {
        let url = url.into().trim_end_matches('/').to_string();
        Self {
            gateway_url: url.clone(),
            engine_url: url,
            ..Self::default()
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

/// Deploy replies read `... Process Key: <key>`.
static PROCESS_KEY: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"Process Key:\s*(\S+)").ok());

/// Pull the process key out of a deploy reply, falling back to the whole reply.
fn process_key_from_reply(reply: &str) -> String {
    PROCESS_KEY
        .as_ref()
        .and_then(|re| re.captures(reply))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim_end_matches('.').to_string())
        .unwrap_or_else(|| reply.trim().to_string())
}

pub struct HttpProcessEngine {
    http: Client,
    gateway_url: String,
    engine_url: String,
}

impl HttpProcessEngine {
    pub fn new(config: EngineClientConfig) -> EngineResult<Self> {
        info!(
            gateway_url = %config.gateway_url,
            engine_url = %config.engine_url,
            timeout_secs = config.timeout_secs,
            authenticated = config.token.is_some(),
            "Initializing process engine client"
        );

        let mut headers = header::HeaderMap::new();
        if let Some(token) = &config.token {
            let value = header::HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| EngineError::InvalidRequest(format!("Invalid token: {e}")))?;
            headers.insert(header::AUTHORIZATION, value);
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| EngineError::InvalidRequest(e.to_string()))?;

        Ok(Self {
            http,
            gateway_url: config.gateway_url,
            engine_url: config.engine_url,
        })
    }

    fn gateway(&self, path: &str) -> String {
        format!("{}{}", self.gateway_url, path)
    }

    fn engine(&self, path: &str) -> String {
        format!("{}{}", self.engine_url, path)
    }

    /// Send once and classify non-2xx replies.
    async fn send(&self, op: &'static str, request: RequestBuilder) -> EngineResult<Response> {
        let response = request.send().await.map_err(|e| {
            warn!(op, error = %e, "engine request failed");
            EngineError::Network(e.to_string())
        })?;

        let status = response.status();
        debug!(op, status = status.as_u16(), "engine response");
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        warn!(op, status = status.as_u16(), body = %scrub_secrets(&body), "engine returned error");
        Err(EngineError::from_status(status.as_u16(), body))
    }

    async fn json<T: DeserializeOwned>(op: &'static str, response: Response) -> EngineResult<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| EngineError::InvalidResponse(format!("{op}: {e}")))
    }

    async fn text(op: &'static str, response: Response) -> EngineResult<String> {
        response
            .text()
            .await
            .map_err(|e| EngineError::InvalidResponse(format!("{op}: {e}")))
    }
}

#[async_trait]
impl ProcessEngine for HttpProcessEngine {
    async fn list_workflows(&self) -> EngineResult<Vec<WorkflowDocument>> {
        let resp = self.send("list_workflows", self.http.get(self.gateway("/workflows"))).await?;
        Self::json("list_workflows", resp).await
    }

    async fn get_workflow(&self, id: &str) -> EngineResult<WorkflowDocument> {
        let url = self.gateway(&format!("/workflows/{id}"));
        let resp = self.send("get_workflow", self.http.get(url)).await?;
        Self::json("get_workflow", resp).await
    }

    async fn create_workflow(&self, workflow: &NewWorkflow) -> EngineResult<WorkflowDocument> {
        let req = self.http.post(self.gateway("/workflows")).json(workflow);
        let resp = self.send("create_workflow", req).await?;
        Self::json("create_workflow", resp).await
    }

    async fn update_workflow(&self, id: &str, update: &WorkflowUpdate) -> EngineResult<WorkflowDocument> {
        let req = self.http.put(self.gateway(&format!("/workflows/{id}"))).json(update);
        let resp = self.send("update_workflow", req).await?;
        Self::json("update_workflow", resp).await
    }

    async fn delete_workflow(&self, id: &str) -> EngineResult<()> {
        let url = self.gateway(&format!("/workflows/{id}"));
        self.send("delete_workflow", self.http.delete(url)).await?;
        Ok(())
    }

    async fn workflow_graph(&self, id: &str) -> EngineResult<GraphListing> {
        let url = self.gateway(&format!("/workflows/{id}/tasks"));
        let resp = self.send("workflow_graph", self.http.get(url)).await?;
        Self::json("workflow_graph", resp).await
    }

    async fn auto_fix_gateway_flows(&self, id: &str) -> EngineResult<()> {
        let url = self.gateway(&format!("/workflows/{id}/auto-fix-gateway-incoming-flow"));
        self.send("auto_fix", self.http.put(url)).await?;
        Ok(())
    }

    async fn deploy(&self, unit: &DeployableUnit) -> EngineResult<String> {
        let part = Part::bytes(unit.bytes.clone())
            .file_name(unit.file_name.clone())
            .mime_str(&unit.content_type)
            .map_err(|e| EngineError::InvalidRequest(format!("content type: {e}")))?;
        let form = Form::new().part("file", part);

        let req = self.http.post(self.gateway("/deploy-process")).multipart(form);
        let resp = self.send("deploy", req).await?;
        let reply = Self::text("deploy", resp).await?;
        Ok(process_key_from_reply(&reply))
    }

    async fn list_processes(&self) -> EngineResult<Vec<ProcessDefinition>> {
        let resp = self.send("list_processes", self.http.get(self.gateway("/list-processes"))).await?;
        Self::json("list_processes", resp).await
    }

    async fn start_process(&self, process_key: &str) -> EngineResult<String> {
        let req = self
            .http
            .get(self.gateway("/start-process"))
            .query(&[("processKey", process_key)]);
        let resp = self.send("start_process", req).await?;
        Self::text("start_process", resp).await
    }

    async fn list_tasks(&self) -> EngineResult<Vec<TaskInstance>> {
        let resp = self.send("list_tasks", self.http.get(self.gateway("/tasks"))).await?;
        Self::json("list_tasks", resp).await
    }

    async fn get_task(&self, task_id: &str) -> EngineResult<TaskInstance> {
        let url = self.engine(&format!("/tasks/{task_id}"));
        let resp = self.send("get_task", self.http.get(url)).await?;
        Self::json("get_task", resp).await
    }

    async fn task_form(&self, task_id: &str) -> EngineResult<Value> {
        let url = self.gateway(&format!("/task/{task_id}/form"));
        let resp = self.send("task_form", self.http.get(url)).await?;
        let body = Self::text("task_form", resp).await?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| EngineError::InvalidResponse(format!("task_form: {e}")))
    }

    async fn claim_task(&self, task_id: &str, user_id: &str) -> EngineResult<()> {
        let req = self
            .http
            .post(self.gateway(&format!("/tasks/{task_id}/user/claim")))
            .query(&[("userId", user_id)]);
        self.send("claim_task", req).await?;
        Ok(())
    }

    async fn submit_task_form(&self, task_id: &str, data: &Value) -> EngineResult<()> {
        let req = self
            .http
            .post(self.engine(&format!("/tasks/{task_id}/submit-form")))
            .json(data);
        self.send("submit_task_form", req).await?;
        Ok(())
    }
}
