//! CLI command implementations.

pub mod deploy;
pub mod draft;
pub mod process;
pub mod task;
pub mod workflow;
