//! Domain layer for flowgate
//!
//! Models for workflow documents, their structural graph, deploy readiness
//! and human tasks, plus the ports the services depend on.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
