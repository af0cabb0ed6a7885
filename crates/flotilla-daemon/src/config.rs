//! Configuration for flotillad

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Deployment API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Scheduler configuration
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Watched projects
    #[serde(default)]
    pub projects: Vec<ProjectConfig>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl DaemonConfig {
    /// Load configuration from a YAML file, or defaults when `path` is None
    pub fn load(path: Option<&str>) -> Result<Self, crate::error::DaemonError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(Path::new(path))
            .map_err(|e| crate::error::DaemonError::Config(format!("{path}: {e}")))?;
        serde_yaml::from_str(&text)
            .map_err(|e| crate::error::DaemonError::Config(format!("{path}: {e}")))
    }
}

/// Deployment API endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the deployment API
    #[serde(default = "default_api_endpoint")]
    pub endpoint: String,

    /// Bearer token sent as `x-token`
    #[serde(default)]
    pub token: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_api_endpoint(),
            token: String::new(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Interval between project polls in seconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Requeue delay after a failed pass in seconds
    #[serde(default = "default_retry_interval")]
    pub retry_interval_secs: u64,

    /// Timeout for git network operations in seconds
    #[serde(default = "default_git_timeout")]
    pub git_timeout_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            retry_interval_secs: default_retry_interval(),
            git_timeout_secs: default_git_timeout(),
        }
    }
}

/// One watched project: a configuration repository plus credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name, also the record namespace
    pub name: String,

    /// HTTPS URL of the configuration repository
    pub remote_uri: String,

    /// Basic-auth user for the repository
    #[serde(default)]
    pub user: String,

    /// Basic-auth token for the repository
    #[serde(default)]
    pub token: String,

    /// Branch to watch; empty follows the remote's default branch
    #[serde(default)]
    pub watched_branch: String,
}

impl ProjectConfig {
    /// Branch the poll actually watches. A non-empty configured branch is
    /// normalized to `master`; an empty one follows the remote default.
    pub fn effective_branch(&self) -> Option<String> {
        if !self.watched_branch.is_empty() {
            Some("master".to_string())
        } else {
            None
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON-formatted logs
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_api_endpoint() -> String {
    "http://api-gateway-nginx/api".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_poll_interval() -> u64 {
    30
}

fn default_retry_interval() -> u64 {
    30
}

fn default_git_timeout() -> u64 {
    120
}

fn default_log_level() -> String {
    "info".to_string()
}
