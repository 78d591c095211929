//! Port trait definitions (Hexagonal Architecture)
//!
//! - ProcessEngine: remote workflow registry, deployment and task operations
//! - DraftStore: session-scoped working copies of workflow documents
//!
//! Services depend on these traits only, so tests can swap in the mock
//! engine and the in-memory draft store.

pub mod draft_store;
pub mod errors;
pub mod process_engine;

pub use draft_store::{DraftSlot, DraftStore};
pub use errors::{EngineError, EngineResult};
pub use process_engine::ProcessEngine;
