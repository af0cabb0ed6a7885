//! CI-side configuration (`.keptn/ci_config.yaml` in the workspace)

use crate::error::{CliError, CliResult};
use serde::Deserialize;
use std::path::Path;

/// Per-repository CI configuration: which services this workspace publishes
/// and the git identity used for configuration commits.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CiConfig {
    #[serde(default)]
    pub services: Vec<CiService>,

    #[serde(default)]
    pub git_config: GitConfig,
}

impl CiConfig {
    /// Load from `path`
    pub fn load(path: &Path) -> CliResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| CliError::Config(format!("{}: {e}", path.display())))?;
        serde_yaml::from_str(&text)
            .map_err(|e| CliError::Config(format!("{}: {e}", path.display())))
    }

    /// The entry for a service name, if declared
    pub fn service(&self, name: &str) -> Option<&CiService> {
        self.services.iter().find(|s| s.name == name)
    }
}

/// One service published from this workspace
#[derive(Debug, Clone, Deserialize)]
pub struct CiService {
    pub name: String,

    /// Chart directory in the workspace copied into the service's base
    /// configuration before publishing
    #[serde(rename = "chart_base", default)]
    pub chart_base: Option<String>,

    /// Run a chart dependency update before publishing
    #[serde(rename = "updateHelmDependencies", default)]
    pub update_helm_dependencies: bool,

    /// Resolve the image version from the chart's `version` field
    #[serde(rename = "useChartVersion", default)]
    pub use_chart_version: bool,

    /// Resolve the image version from the chart's `appVersion` field
    #[serde(rename = "useChartAppVersion", default)]
    pub use_chart_app_version: bool,

    /// Swallow duplicate-tag push conflicts for this service
    #[serde(rename = "ignoreDuplicateGitTag", default)]
    pub ignore_duplicate_git_tag: bool,
}

/// Git identity and target branch for configuration commits
#[derive(Debug, Clone, Deserialize)]
pub struct GitConfig {
    #[serde(default = "default_user_email")]
    pub user_email: String,

    #[serde(default = "default_user_name")]
    pub user_name: String,

    /// Branch configuration commits are pushed to; empty uses the
    /// repository's default branch
    #[serde(default)]
    pub deployment_branch: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            user_email: default_user_email(),
            user_name: default_user_name(),
            deployment_branch: String::new(),
        }
    }
}

fn default_user_email() -> String {
    "ci-connect@flotilla.dev".to_string()
}

fn default_user_name() -> String {
    "Flotilla CI Connector".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ci_config() {
        let yaml = r#"
services:
  - name: "carts"
    chart_base: "helm/carts"
    useChartAppVersion: true
    ignoreDuplicateGitTag: true
git_config:
  user_email: "jenkins@example.com"
  user_name: "jenkins"
  deployment_branch: "deploy"
"#;
        let config: CiConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.services.len(), 1);
        let service = config.service("carts").unwrap();
        assert_eq!(service.chart_base.as_deref(), Some("helm/carts"));
        assert!(service.use_chart_app_version);
        assert!(service.ignore_duplicate_git_tag);
        assert_eq!(config.git_config.user_name, "jenkins");
        assert_eq!(config.git_config.deployment_branch, "deploy");
    }

    #[test]
    fn test_git_config_defaults() {
        let config: CiConfig = serde_yaml::from_str("services: []").unwrap();
        assert_eq!(config.git_config.user_name, "Flotilla CI Connector");
        assert!(config.git_config.deployment_branch.is_empty());
    }
}
