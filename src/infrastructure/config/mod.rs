//! Configuration management infrastructure
//!
//! Hierarchical configuration using figment:
//! - YAML project and local files
//! - `FLOWGATE_*` environment overrides
//! - Validation of endpoints, timeouts and logging settings

pub mod loader;

pub use loader::{ConfigError, ConfigLoader};
