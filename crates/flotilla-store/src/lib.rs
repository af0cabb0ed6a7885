//! Flotilla Store - Versioned object store for coordination objects
//!
//! Service records and project state are shared between the coordinator and
//! the agent, which must be independently restartable. They are therefore
//! never shared as in-process memory: every object lives behind a store
//! handle, carries a version, and is updated with compare-and-swap. A writer
//! that loses a version race gets [`StoreError::VersionConflict`] and is
//! expected to re-read and recompute, never force-overwrite.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use traits::{ProjectStateStore, RecordStore, Store, Versioned};
