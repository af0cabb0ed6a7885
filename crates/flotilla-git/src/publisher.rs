//! Commit-tag-push publishing with optimistic-concurrency retry

use crate::cmd::{run_git, run_git_raw};
use crate::error::{GitError, Result};
use crate::remote::GitRemote;
use async_trait::async_trait;
use std::path::Path;

/// Options for one published commit
#[derive(Debug, Clone)]
pub struct CommitOptions {
    /// Commit message
    pub message: String,

    /// Fixed author identity
    pub author_name: String,
    pub author_email: String,

    /// Annotated tag to create at `HEAD` and push, if non-empty
    pub tag: Option<String>,

    /// Message for the annotated tag
    pub tag_message: String,

    /// Swallow duplicate-tag conflicts instead of failing
    pub allow_duplicate_tag: bool,
}

impl CommitOptions {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            author_name: "flotilla".into(),
            author_email: "flotilla@localhost".into(),
            tag: None,
            tag_message: String::new(),
            allow_duplicate_tag: false,
        }
    }

    pub fn with_author(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        self.author_name = name.into();
        self.author_email = email.into();
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>, message: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self.tag_message = message.into();
        self
    }

    pub fn allow_duplicate_tag(mut self, allow: bool) -> Self {
        self.allow_duplicate_tag = allow;
        self
    }
}

/// Content changes re-applied on every publish attempt.
///
/// The working copy handed to `apply` is always a fresh clone of the remote
/// tip, so an implementation must derive its changes from sources outside
/// the working copy and may be called any number of times.
#[async_trait]
pub trait ChangeSet: Send + Sync {
    async fn apply(&self, workdir: &Path) -> Result<()>;
}

/// Stage all changes in `workdir`, commit, optionally tag, and push.
///
/// The branch push and the tag push are independent operations. Any push
/// failure is classified [`GitError::PushRejected`] — the only error kind a
/// caller may retry — except a tag push refused because the identical tag
/// already exists, which is swallowed (logged) when
/// `options.allow_duplicate_tag` is set.
pub async fn publish(workdir: &Path, options: &CommitOptions) -> Result<()> {
    let timeout = crate::cmd::DEFAULT_TIMEOUT;
    let author_name = format!("user.name={}", options.author_name);
    let author_email = format!("user.email={}", options.author_email);

    // Stage everything, deletions included.
    run_git(Some(workdir), &["add", "-A"], timeout).await?;

    run_git(
        Some(workdir),
        &[
            "-c",
            author_name.as_str(),
            "-c",
            author_email.as_str(),
            "commit",
            "-m",
            options.message.as_str(),
        ],
        timeout,
    )
    .await?;

    if let Some(tag) = options.tag.as_deref().filter(|t| !t.is_empty()) {
        create_tag(workdir, tag, options).await?;
    }

    push(workdir, &["push", "origin", "HEAD"], "branch", None).await?;

    if let Some(tag) = options.tag.as_deref().filter(|t| !t.is_empty()) {
        let refspec = format!("refs/tags/{tag}");
        let swallow_existing = options.allow_duplicate_tag.then_some(tag);
        push(workdir, &["push", "origin", refspec.as_str()], "tag", swallow_existing).await?;
    }

    Ok(())
}

async fn create_tag(workdir: &Path, tag: &str, options: &CommitOptions) -> Result<()> {
    let timeout = crate::cmd::DEFAULT_TIMEOUT;
    let author_name = format!("user.name={}", options.author_name);
    let author_email = format!("user.email={}", options.author_email);
    let result = run_git(
        Some(workdir),
        &[
            "-c",
            author_name.as_str(),
            "-c",
            author_email.as_str(),
            "tag",
            "-a",
            tag,
            "-m",
            options.tag_message.as_str(),
        ],
        timeout,
    )
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(GitError::Command { stderr, .. }) if stderr.contains("already exists") => {
            if options.allow_duplicate_tag {
                tracing::info!(tag, "ignoring duplicate git tag");
                Ok(())
            } else {
                Err(GitError::PushRejected(format!("tag {tag} already exists")))
            }
        }
        Err(other) => Err(other),
    }
}

/// Run a push and classify its failure. With `swallow_existing_tag` set, a
/// rejection caused by a pre-existing identical tag is logged and dropped.
async fn push(
    workdir: &Path,
    args: &[&str],
    what: &str,
    swallow_existing_tag: Option<&str>,
) -> Result<()> {
    let output = run_git_raw(Some(workdir), args, crate::cmd::DEFAULT_TIMEOUT).await?;
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

    if let Some(tag) = swallow_existing_tag {
        if stderr.contains("already exists") {
            tracing::info!(tag, "ignoring duplicate git tag on remote");
            return Ok(());
        }
    }

    tracing::warn!(what, stderr = %stderr, "push refused");
    Err(GitError::PushRejected(stderr))
}

/// Publish with the whole-operation retry protocol.
///
/// Each attempt clones `remote` (branch `branch`, or the default branch)
/// into a fresh temp dir, re-applies `changes` from scratch, and publishes
/// with `options`. Only [`GitError::PushRejected`] triggers another attempt:
/// the working copy went stale because a concurrent writer pushed first, and
/// the re-clone rebases the retried commit on the new tip. Every other error
/// aborts immediately. Exhausting `max_attempts` yields
/// [`GitError::RetriesExhausted`].
pub async fn publish_with_retry(
    remote: &GitRemote,
    branch: Option<&str>,
    options: &CommitOptions,
    max_attempts: u32,
    changes: &dyn ChangeSet,
) -> Result<()> {
    for attempt in 1..=max_attempts.max(1) {
        let scratch = tempfile::tempdir()?;
        let workdir = scratch.path().join("repo");

        remote.clone_into(&workdir, branch).await?;
        changes.apply(&workdir).await?;

        match publish(&workdir, options).await {
            Ok(()) => {
                tracing::info!(remote = %remote, attempt, "published");
                return Ok(());
            }
            Err(err) if err.is_push_rejection() => {
                tracing::warn!(remote = %remote, attempt, error = %err, "push rejected, re-cloning");
            }
            Err(err) => return Err(err),
        }
    }
    Err(GitError::RetriesExhausted {
        attempts: max_attempts.max(1),
    })
}
