//! Process engine adapters.

pub mod client;
pub mod mock;

pub use client::{EngineClientConfig, HttpProcessEngine};
pub use mock::{MockCall, MockFailure, MockProcessEngine};
