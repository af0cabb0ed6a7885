//! Error types for the CLI

use thiserror::Error;

/// CLI error type
#[derive(Debug, Error)]
pub enum CliError {
    /// CI configuration file missing or invalid
    #[error("CI configuration error: {0}")]
    Config(String),

    /// Git operation failed
    #[error(transparent)]
    Git(#[from] flotilla_git::GitError),

    /// Configuration-repository file handling failed
    #[error(transparent)]
    Extract(#[from] flotilla_extract::ExtractError),

    /// Chart metadata lookup failed
    #[error("chart error: {0}")]
    Chart(String),

    /// Filesystem failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
