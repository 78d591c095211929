pub mod config;
pub mod defect;
pub mod deployment;
pub mod form;
pub mod graph;
pub mod task;
pub mod workflow;

pub use config::{Config, DeployConfig, DraftsConfig, EngineConfig, LoggingConfig, TasksConfig};
pub use defect::{AdvisoryKind, ConfigurationAdvisory, DefectKind, DeployDefect, ReadinessVerdict};
pub use deployment::{AutoFixOffer, AutoFixReason, AutoFixTrigger, DeployOutcome, DeployPhase};
pub use form::{ComponentType, FormComponent, FormSchema, FormState};
pub use graph::{
    FlowRef, GatewayDirection, GatewayKind, GatewayNode, GraphListing, GraphModel, TaskKind,
    TaskNode,
};
pub use task::{MutationState, SubmitBlock, TaskInstance, TaskPhase};
pub use workflow::{
    ConfigEntry, DeployableUnit, NewWorkflow, ProcessDefinition, WorkflowDocument, WorkflowUpdate,
};
