//! Error types for git operations

use thiserror::Error;

/// Git operation error type
#[derive(Debug, Error)]
pub enum GitError {
    /// The remote refused the push (non-fast-forward or conflicting ref).
    /// The only error class eligible for whole-operation retry.
    #[error("push rejected by remote: {0}")]
    PushRejected(String),

    /// All publish attempts were rejected
    #[error("publish gave up after {attempts} rejected attempts")]
    RetriesExhausted { attempts: u32 },

    /// A git command exited unsuccessfully
    #[error("git {action} failed: {stderr}")]
    Command { action: String, stderr: String },

    /// A git command exceeded its timeout
    #[error("git {action} timed out after {seconds}s")]
    Timeout { action: String, seconds: u64 },

    /// The git binary could not be spawned
    #[error("could not run git: {0}")]
    Spawn(#[from] std::io::Error),

    /// Command output was not parseable
    #[error("unexpected git output for {action}: {detail}")]
    Output { action: String, detail: String },

    /// Content changes could not be applied to the working copy
    #[error("could not apply content changes: {0}")]
    Apply(String),
}

impl GitError {
    /// Whether the publish caller may retry with a fresh clone
    pub fn is_push_rejection(&self) -> bool {
        matches!(self, GitError::PushRejected(_))
    }

    /// Wrap a caller-side content-change failure
    pub fn apply(err: impl std::fmt::Display) -> Self {
        GitError::Apply(err.to_string())
    }
}

/// Result type for git operations
pub type Result<T> = std::result::Result<T, GitError>;
