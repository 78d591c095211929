//! Infrastructure layer module
//!
//! - Configuration management (figment)
//! - Logging infrastructure (tracing)
//!
//! Adapters that satisfy the domain ports live in `crate::adapters`.

pub mod config;
pub mod logging;
