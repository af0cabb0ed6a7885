//! Error types for the daemon

use thiserror::Error;

/// Daemon error type
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Configuration could not be loaded or is invalid
    #[error("configuration error: {0}")]
    Config(String),

    /// Git operation failed during a pass
    #[error(transparent)]
    Git(#[from] flotilla_git::GitError),

    /// Desired-state extraction failed during a pass
    #[error(transparent)]
    Extract(#[from] flotilla_extract::ExtractError),

    /// A reconciler pass failed
    #[error(transparent)]
    Reconcile(#[from] flotilla_reconcile::ReconcileError),

    /// Store failure outside a reconciler pass
    #[error(transparent)]
    Store(#[from] flotilla_store::StoreError),

    /// Deployment API client could not be built
    #[error(transparent)]
    Deploy(#[from] flotilla_deploy::DeployError),

    /// Scratch-directory failure
    #[error("scratch directory error: {0}")]
    Io(#[from] std::io::Error),
}

impl DaemonError {
    /// Whether this pass merely lost an optimistic-concurrency race
    pub fn is_conflict(&self) -> bool {
        match self {
            DaemonError::Reconcile(err) => err.is_conflict(),
            DaemonError::Store(err) => err.is_conflict(),
            _ => false,
        }
    }
}

/// Result type for daemon operations
pub type DaemonResult<T> = Result<T, DaemonError>;
