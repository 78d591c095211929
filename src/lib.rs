//! Flowgate - deploy gate and task desk for BPMN workflows
//!
//! Flowgate checks a workflow's gateway wiring against the engine's own view
//! of the graph before every deployment, offers the engine's gateway auto-fix
//! when the defect is one it can repair, and drives human tasks through
//! claim, edit and submit without racing other users.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): models, state machines and port traits
//! - **Service Layer** (`services`): validation, deployment and task lifecycle
//! - **Adapters** (`adapters`): HTTP process engine, SQLite and in-memory drafts, test mock
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use flowgate::adapters::engine::{EngineClientConfig, HttpProcessEngine};
//! use flowgate::adapters::memory::InMemoryDraftStore;
//! use flowgate::services::DeploymentOrchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let engine = Arc::new(HttpProcessEngine::new(EngineClientConfig::single_base("http://localhost:8080"))?);
//!     let orchestrator = DeploymentOrchestrator::new(engine, Arc::new(InMemoryDraftStore::default()));
//!     let outcome = orchestrator.deploy("wf-1", "<bpmn:definitions/>").await?;
//!     println!("{:?}", outcome.phase());
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    Config, DeployOutcome, DeployPhase, FormSchema, FormState, GraphModel, ReadinessVerdict,
    TaskInstance, TaskPhase, WorkflowDocument,
};
pub use domain::ports::{DraftStore, EngineError, ProcessEngine};
