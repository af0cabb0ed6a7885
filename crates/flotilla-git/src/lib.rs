//! Flotilla Git - Working-copy operations and the publish protocol
//!
//! Git is the coordination medium: independent writers commit, tag, and
//! push configuration changes with optimistic-concurrency retry instead of
//! locking. A push rejected by the remote is the only retryable failure;
//! the retry discards the working copy, re-clones from the remote tip, and
//! re-applies all content changes from scratch, so the retried commit is
//! always rebased on whatever a concurrent writer pushed first.
//!
//! All operations shell out to the `git` binary with caller-imposed
//! timeouts; nothing here blocks indefinitely.

pub mod cmd;
pub mod error;
pub mod publisher;
pub mod remote;

pub use error::{GitError, Result};
pub use publisher::{publish, publish_with_retry, ChangeSet, CommitOptions};
pub use remote::{head_author_email, head_commit, GitRemote};

/// Default bound for publish retries after push rejection
pub const DEFAULT_PUSH_MAX_ATTEMPTS: u32 = 10;
