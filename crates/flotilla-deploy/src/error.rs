//! Error types for deployment API calls

use thiserror::Error;

/// Deployment API error type. All variants are transient from the
/// reconciler's point of view: the pending flag stays set and the pass is
/// requeued.
#[derive(Debug, Error)]
pub enum DeployError {
    /// Transport-level failure (connect, timeout, TLS)
    #[error("deployment API request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API answered with an unexpected status
    #[error("deployment API returned {status} for {action}")]
    Status { action: String, status: u16 },
}

/// Result type for deployment API operations
pub type Result<T> = std::result::Result<T, DeployError>;
