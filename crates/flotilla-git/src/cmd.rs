//! Subprocess runner for the `git` binary

use crate::error::{GitError, Result};
use std::path::Path;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

/// Default timeout for a single git invocation. Network operations (clone,
/// push, ls-remote) go through the same bound; the caller can widen it.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Run `git <args>` in `dir`, enforcing `timeout`, and return stdout.
///
/// A non-zero exit is an error carrying trimmed stderr; stderr is also what
/// push-rejection classification inspects, so it is preserved verbatim.
pub async fn run_git(dir: Option<&Path>, args: &[&str], timeout: Duration) -> Result<String> {
    let output = run_git_raw(dir, args, timeout).await?;
    if !output.status.success() {
        return Err(GitError::Command {
            action: action_of(args),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Like [`run_git`] but hands back the raw output so callers can classify
/// failures themselves (the publisher does this for pushes).
pub async fn run_git_raw(dir: Option<&Path>, args: &[&str], timeout: Duration) -> Result<Output> {
    let mut command = Command::new("git");
    if let Some(dir) = dir {
        command.current_dir(dir);
    }
    command.args(args);
    command.kill_on_drop(true);

    let action = action_of(args);
    tracing::trace!(action = %action, "running git");

    match tokio::time::timeout(timeout, command.output()).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(GitError::Timeout {
            action,
            seconds: timeout.as_secs(),
        }),
    }
}

fn action_of(args: &[&str]) -> String {
    // First argument that is neither a flag nor a `-c key=value` pair names
    // the subcommand; good enough for error labels.
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if *arg == "-c" || *arg == "-C" {
            iter.next();
            continue;
        }
        if arg.starts_with('-') {
            continue;
        }
        return (*arg).to_string();
    }
    "<none>".to_string()
}
