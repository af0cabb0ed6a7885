//! `flotilla trigger-deployment`
//!
//! Copies service configuration from the CI workspace's `.keptn` directory
//! into a clone of the fleet configuration repository, writes the
//! deployment metadata manifest the daemon resolves versions from, commits
//! with a `<service>-<version>` tag, and pushes with bounded retry. The
//! whole clone-update-commit cycle is the retried unit, so a rejected push
//! always redoes the content changes on a fresh clone of the remote tip.

use super::GitRepoArgs;
use crate::chart;
use crate::config::{CiConfig, CiService};
use crate::error::CliResult;
use crate::fsutil;
use async_trait::async_trait;
use flotilla_extract::{
    read_operator_config, read_shipyard, resolve_stage_and_sequence, write_deployment_metadata,
    write_operator_config, ExtractError, OperatorConfig,
};
use flotilla_git::{publish_with_retry, ChangeSet, CommitOptions, GitError, GitRemote};
use flotilla_types::{DeploymentMetadata, ServiceDeclaration};
use std::path::{Path, PathBuf};

/// Arguments for `trigger-deployment`. Every flag can also be set through
/// its environment variable.
#[derive(Debug, clap::Args)]
pub struct TriggerDeployArgs {
    /// Path to the directory the .keptn directory resides in
    #[arg(short = 'w', long, env = "WORKSPACE")]
    pub workspace: PathBuf,

    /// The service which should be deployed
    #[arg(short = 's', long, env = "SERVICE")]
    pub service: String,

    /// The version of the deployment; resolved from the chart or a
    /// timestamp when empty
    #[arg(short = 'x', long, env = "VERSION", default_value = "")]
    pub version: String,

    /// The commit message for the deployment
    #[arg(short = 'c', long, env = "COMMIT_MESSAGE", default_value = "")]
    pub commit_message: String,

    /// Stage for the trigger event, overriding the shipyard default
    #[arg(short = 'g', long, env = "STAGE", default_value = "")]
    pub stage: String,

    /// Sequence for the trigger event, overriding the shipyard default
    #[arg(short = 'q', long, env = "SEQUENCE", default_value = "")]
    pub sequence: String,

    /// Perform a dry-run
    #[arg(short = 'd', long)]
    pub dry_run: bool,

    /// Bound on publish attempts after push rejection
    #[arg(long, default_value_t = flotilla_git::DEFAULT_PUSH_MAX_ATTEMPTS)]
    pub max_attempts: u32,

    #[command(flatten)]
    pub repo: GitRepoArgs,
}

pub async fn run(args: TriggerDeployArgs) -> CliResult<()> {
    let base_dir = args.workspace.join(".keptn");
    let ci = CiConfig::load(&base_dir.join("ci_config.yaml"))?;
    let remote = args.repo.remote();

    // Facts about the source commit being published, stamped into every
    // service's deployment metadata manifest.
    let source_commit = flotilla_git::head_commit(&args.workspace).await?;
    let author = flotilla_git::head_author_email(&args.workspace).await?;

    // Stage charts into the workspace tree and resolve one version per
    // published service. Both are workspace-side and stable across publish
    // attempts.
    let mut services = Vec::new();
    for service in &ci.services {
        stage_chart(&base_dir, &args.workspace, service).await?;
        let version = resolve_version(&args.version, service, &base_dir)?;
        services.push((service.clone(), version));
    }

    let tag_version = services
        .iter()
        .find(|(s, _)| s.name == args.service)
        .map(|(_, v)| v.clone())
        .unwrap_or_else(|| args.version.clone());
    let message = if args.commit_message.is_empty() {
        format!("Update service {} to version {}", args.service, tag_version)
    } else {
        args.commit_message.clone()
    };
    let options = CommitOptions::new(message)
        .with_author(
            ci.git_config.user_name.clone(),
            ci.git_config.user_email.clone(),
        )
        .with_tag(
            format!("{}-{}", args.service, tag_version),
            format!("Version {}-{}", args.service, tag_version),
        )
        .allow_duplicate_tag(
            ci.service(&args.service)
                .map(|s| s.ignore_duplicate_git_tag)
                .unwrap_or(false),
        );
    let branch = deployment_branch(&ci);

    let changes = DeploymentUpdate {
        remote: remote.clone(),
        base_dir,
        services,
        stage_override: non_empty(&args.stage),
        sequence_override: non_empty(&args.sequence),
        source_commit: source_commit.to_string(),
        author,
    };

    if args.dry_run {
        let scratch = tempfile::tempdir()?;
        let workdir = scratch.path().join("repo");
        remote.clone_into(&workdir, branch.as_deref()).await?;
        changes.apply(&workdir).await?;
        tracing::info!(
            service = %args.service,
            version = %tag_version,
            "dry run: changes prepared, nothing published"
        );
        return Ok(());
    }

    publish_with_retry(&remote, branch.as_deref(), &options, args.max_attempts, &changes).await?;
    tracing::info!(service = %args.service, version = %tag_version, "deployment published");
    Ok(())
}

/// Copy the chart out of the workspace into the service's base directory
/// and update its dependencies when asked to.
async fn stage_chart(base_dir: &Path, workspace: &Path, service: &CiService) -> CliResult<()> {
    let helm_dir = helm_path(base_dir, &service.name);
    if let Some(chart_base) = service.chart_base.as_deref().filter(|c| !c.is_empty()) {
        fsutil::replace_dir(&workspace.join(chart_base), &helm_dir)?;
    }
    if service.update_helm_dependencies {
        chart::dependency_update(&helm_dir).await?;
    }
    Ok(())
}

/// Explicit version, chart-derived version, or a unix-timestamp fallback
fn resolve_version(explicit: &str, service: &CiService, base_dir: &Path) -> CliResult<String> {
    if !explicit.is_empty() {
        return Ok(explicit.to_string());
    }
    let helm_dir = helm_path(base_dir, &service.name);
    if service.use_chart_app_version {
        chart::chart_app_version(&helm_dir)
    } else if service.use_chart_version {
        chart::chart_version(&helm_dir)
    } else {
        Ok(chrono::Utc::now().timestamp().to_string())
    }
}

fn helm_path(base_dir: &Path, service: &str) -> PathBuf {
    base_dir.join("base").join(service).join("helm").join(service)
}

fn deployment_branch(ci: &CiConfig) -> Option<String> {
    non_empty(&ci.git_config.deployment_branch)
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Content changes for one deployment publish, re-applied from scratch on
/// every attempt.
struct DeploymentUpdate {
    remote: GitRemote,
    base_dir: PathBuf,
    services: Vec<(CiService, String)>,
    stage_override: Option<String>,
    sequence_override: Option<String>,
    source_commit: String,
    author: String,
}

#[async_trait]
impl ChangeSet for DeploymentUpdate {
    async fn apply(&self, workdir: &Path) -> Result<(), GitError> {
        // The trigger event is resolved against the default branch's
        // shipyard, not the deployment branch being written to.
        let scratch = tempfile::tempdir().map_err(GitError::apply)?;
        let main_dir = scratch.path().join("main");
        self.remote.clone_into(&main_dir, None).await?;
        let shipyard = read_shipyard(&main_dir).map_err(GitError::apply)?;
        let (stage, sequence) = resolve_stage_and_sequence(
            &shipyard,
            self.stage_override.as_deref(),
            self.sequence_override.as_deref(),
        )
        .map_err(GitError::apply)?;
        let trigger = format!("sh.keptn.event.{stage}.{sequence}.triggered");

        let mut operator = match read_operator_config(workdir) {
            Ok(config) => config,
            Err(ExtractError::MissingConfig { .. }) => OperatorConfig::default(),
            Err(err) => return Err(GitError::apply(err)),
        };

        for (service, version) in &self.services {
            let base_source = self.base_dir.join("base").join(&service.name);
            if base_source.exists() {
                fsutil::replace_dir(&base_source, &workdir.join("base").join(&service.name))
                    .map_err(GitError::apply)?;
            }
            self.copy_stage_overlays(workdir, &service.name)?;

            match operator.services.iter_mut().find(|s| s.name == service.name) {
                Some(entry) => entry.deployment_trigger = trigger.clone(),
                None => operator
                    .services
                    .push(ServiceDeclaration::new(service.name.clone(), trigger.clone())),
            }

            write_deployment_metadata(
                workdir,
                &service.name,
                &DeploymentMetadata {
                    image_version: version.clone(),
                    git_commit: self.source_commit.clone(),
                    author: self.author.clone(),
                },
            )
            .map_err(GitError::apply)?;
        }

        write_operator_config(workdir, &operator).map_err(GitError::apply)
    }
}

impl DeploymentUpdate {
    /// Copy per-stage overlays of one service from the workspace into the
    /// working copy, replacing whatever a previous publish left there.
    fn copy_stage_overlays(&self, workdir: &Path, service: &str) -> Result<(), GitError> {
        let stages_dir = self.base_dir.join("stages");
        let Ok(entries) = std::fs::read_dir(&stages_dir) else {
            return Ok(());
        };
        for entry in entries.flatten() {
            if !entry.path().is_dir() {
                continue;
            }
            let source = entry.path().join(service);
            if source.exists() {
                let destination = workdir.join("stages").join(entry.file_name()).join(service);
                fsutil::replace_dir(&source, &destination).map_err(GitError::apply)?;
            }
        }
        Ok(())
    }
}
