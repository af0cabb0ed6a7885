//! Remote repository handle: authenticated clone and head probes

use crate::cmd::{run_git, DEFAULT_TIMEOUT};
use crate::error::{GitError, Result};
use flotilla_types::SourceRevision;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// A remote configuration repository with HTTPS basic-auth credentials.
///
/// The token is embedded into the clone/fetch URL and must never appear in
/// logs; `Display` and `Debug` show the bare URL only.
#[derive(Clone)]
pub struct GitRemote {
    url: String,
    user: String,
    token: String,
    timeout: Duration,
}

impl GitRemote {
    pub fn new(url: impl Into<String>, user: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            user: user.into(),
            token: token.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the network timeout for this remote's operations
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The remote URL without credentials
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Clone URL with embedded credentials. Kept crate-private so the
    /// secret-bearing form never leaves this crate.
    pub(crate) fn authenticated_url(&self) -> String {
        if self.user.is_empty() && self.token.is_empty() {
            return self.url.clone();
        }
        match self.url.split_once("://") {
            Some((scheme, rest)) => {
                format!("{}://{}:{}@{}", scheme, self.user, self.token, rest)
            }
            // Local paths and scp-style URLs take no basic auth.
            None => self.url.clone(),
        }
    }

    /// Clone the remote into `dir`. With `branch` set, a single-branch clone
    /// of that branch; otherwise the remote's default branch.
    pub async fn clone_into(&self, dir: &Path, branch: Option<&str>) -> Result<()> {
        let url = self.authenticated_url();
        let target = dir.to_string_lossy().to_string();
        let mut args = vec!["clone", "--single-branch"];
        if let Some(branch) = branch {
            args.extend(["--branch", branch]);
        }
        args.extend([url.as_str(), target.as_str()]);

        tracing::debug!(remote = %self.url, branch = branch.unwrap_or("<default>"), "cloning");
        run_git(None, &args, self.timeout).await.map_err(redact(&url, &self.url))?;
        Ok(())
    }

    /// Commit hash at the tip of `branch` (or the remote HEAD), without a
    /// checkout. This is the scheduler's revision-change probe.
    pub async fn remote_head(&self, branch: Option<&str>) -> Result<SourceRevision> {
        let url = self.authenticated_url();
        let refspec = match branch {
            Some(branch) => format!("refs/heads/{branch}"),
            None => "HEAD".to_string(),
        };
        let out = run_git(None, &["ls-remote", url.as_str(), refspec.as_str()], self.timeout)
            .await
            .map_err(redact(&url, &self.url))?;

        let hash = out
            .lines()
            .next()
            .and_then(|line| line.split_whitespace().next())
            .filter(|h| !h.is_empty())
            .ok_or_else(|| GitError::Output {
                action: "ls-remote".into(),
                detail: format!("no ref matching {refspec}"),
            })?;
        Ok(SourceRevision::new(hash))
    }
}

// Neither Display nor Debug may print credentials.
impl fmt::Display for GitRemote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

impl fmt::Debug for GitRemote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitRemote").field("url", &self.url).finish()
    }
}

/// Strip the credentialed URL out of error text before it can be logged.
fn redact<'a>(secret_url: &'a str, bare_url: &'a str) -> impl Fn(GitError) -> GitError + 'a {
    move |err| match err {
        GitError::Command { action, stderr } => GitError::Command {
            action,
            stderr: stderr.replace(secret_url, bare_url),
        },
        other => other,
    }
}

/// Commit hash of `HEAD` in a local working copy
pub async fn head_commit(dir: &Path) -> Result<SourceRevision> {
    let out = run_git(Some(dir), &["rev-parse", "HEAD"], DEFAULT_TIMEOUT).await?;
    let hash = out.trim();
    if hash.is_empty() {
        return Err(GitError::Output {
            action: "rev-parse".into(),
            detail: "empty HEAD".into(),
        });
    }
    Ok(SourceRevision::new(hash))
}

/// Author email of the commit at `HEAD` in a local working copy
pub async fn head_author_email(dir: &Path) -> Result<String> {
    let out = run_git(Some(dir), &["log", "-1", "--format=%ae"], DEFAULT_TIMEOUT).await?;
    Ok(out.trim().to_string())
}
