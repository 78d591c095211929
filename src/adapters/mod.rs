//! Adapters implementing the domain ports.

pub mod engine;
pub mod memory;
pub mod sqlite;
