//! Application services.
//!
//! Each service is generic over the ports it needs and holds them as
//! `Arc`s, so the CLI wires the HTTP engine and SQLite drafts while tests
//! wire the mock engine and in-memory drafts.

pub mod auto_fix;
pub mod deployment_orchestrator;
pub mod draft_service;
pub mod form_normalizer;
pub mod graph_extractor;
pub mod readiness_validator;
pub mod task_lifecycle;

pub use auto_fix::AutoFixService;
pub use deployment_orchestrator::DeploymentOrchestrator;
pub use draft_service::DraftService;
pub use form_normalizer::normalize_schema;
pub use graph_extractor::{build_graph, GraphExtractor};
pub use readiness_validator::ReadinessValidator;
pub use task_lifecycle::{TaskCache, TaskLifecycleController, TaskView};
