//! Error types for reconciliation passes

use thiserror::Error;

/// Reconciliation error type.
///
/// Every variant ends the current pass; the scheduler requeues the object
/// after its retry interval. A version conflict is a lost optimistic race,
/// not a fault — the next pass re-reads and recomputes.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Store failure, including lost version races
    #[error(transparent)]
    Store(#[from] flotilla_store::StoreError),

    /// Deployment API failure; the pending flag stays set
    #[error(transparent)]
    Deploy(#[from] flotilla_deploy::DeployError),
}

impl ReconcileError {
    /// Whether this pass merely lost an optimistic-concurrency race
    pub fn is_conflict(&self) -> bool {
        matches!(self, ReconcileError::Store(err) if err.is_conflict())
    }
}

/// Result type for reconciliation operations
pub type Result<T> = std::result::Result<T, ReconcileError>;
