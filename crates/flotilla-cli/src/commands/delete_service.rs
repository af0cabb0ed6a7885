//! `flotilla delete-service`
//!
//! Removes a service's configuration from the fleet repository: its base
//! directory, every per-stage overlay, and its operator-config entry. The
//! daemon reacts to the resulting commit by marking the service for
//! deletion and, once the deployment API confirmed, removing its record.

use super::GitRepoArgs;
use crate::error::CliResult;
use crate::fsutil;
use async_trait::async_trait;
use flotilla_extract::{read_operator_config, write_operator_config, ExtractError, OperatorConfig};
use flotilla_git::{publish_with_retry, ChangeSet, CommitOptions, GitError};
use std::path::Path;

/// Arguments for `delete-service`
#[derive(Debug, clap::Args)]
pub struct DeleteServiceArgs {
    /// The service which should be deleted
    #[arg(short = 's', long, env = "SERVICE")]
    pub service: String,

    /// The commit message for the deletion
    #[arg(short = 'c', long, env = "COMMIT_MESSAGE", default_value = "")]
    pub commit_message: String,

    /// Perform a dry-run
    #[arg(short = 'd', long)]
    pub dry_run: bool,

    /// Bound on publish attempts after push rejection
    #[arg(long, default_value_t = flotilla_git::DEFAULT_PUSH_MAX_ATTEMPTS)]
    pub max_attempts: u32,

    #[command(flatten)]
    pub repo: GitRepoArgs,
}

pub async fn run(args: DeleteServiceArgs) -> CliResult<()> {
    let remote = args.repo.remote();
    let message = if args.commit_message.is_empty() {
        format!("Delete configuration of service {}", args.service)
    } else {
        args.commit_message.clone()
    };
    let options = CommitOptions::new(message);
    let changes = ConfigurationRemoval {
        service: args.service.clone(),
    };

    if args.dry_run {
        let scratch = tempfile::tempdir()?;
        let workdir = scratch.path().join("repo");
        remote.clone_into(&workdir, None).await?;
        changes.apply(&workdir).await?;
        tracing::info!(service = %args.service, "dry run: removal prepared, nothing published");
        return Ok(());
    }

    publish_with_retry(&remote, None, &options, args.max_attempts, &changes).await?;
    tracing::info!(service = %args.service, "service configuration deleted");
    Ok(())
}

/// Content changes removing one service's configuration
struct ConfigurationRemoval {
    service: String,
}

#[async_trait]
impl ChangeSet for ConfigurationRemoval {
    async fn apply(&self, workdir: &Path) -> Result<(), GitError> {
        fsutil::remove_dir_if_exists(&workdir.join("base").join(&self.service))
            .map_err(GitError::apply)?;

        let stages_dir = workdir.join("stages");
        if let Ok(entries) = std::fs::read_dir(&stages_dir) {
            for entry in entries.flatten() {
                if entry.path().is_dir() {
                    fsutil::remove_dir_if_exists(&entry.path().join(&self.service))
                        .map_err(GitError::apply)?;
                }
            }
        }

        let mut operator = match read_operator_config(workdir) {
            Ok(config) => config,
            Err(ExtractError::MissingConfig { .. }) => OperatorConfig::default(),
            Err(err) => return Err(GitError::apply(err)),
        };
        if operator.remove_service(&self.service) {
            write_operator_config(workdir, &operator).map_err(GitError::apply)?;
        }
        Ok(())
    }
}
