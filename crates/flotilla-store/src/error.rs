//! Error types for the object store

use thiserror::Error;

/// Store error type
#[derive(Debug, Error)]
pub enum StoreError {
    /// Optimistic version check failed; re-read and recompute
    #[error("version conflict on {key}: expected {expected}, found {actual}")]
    VersionConflict {
        key: String,
        expected: u64,
        actual: u64,
    },

    /// Object does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Backend failure
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether this error is a lost optimistic-concurrency race
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::VersionConflict { .. })
    }
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;
