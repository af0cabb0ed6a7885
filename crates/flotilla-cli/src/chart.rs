//! Chart metadata boundary
//!
//! Chart tooling is an external collaborator; only two touch points exist
//! here: reading version fields out of `Chart.yaml`, and delegating a
//! dependency update to the `helm` binary when a service asks for it.

use crate::error::{CliError, CliResult};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    version: String,
    #[serde(default, rename = "appVersion")]
    app_version: String,
}

fn read_chart_meta(chart_dir: &Path) -> CliResult<ChartMeta> {
    let path = chart_dir.join("Chart.yaml");
    let text = std::fs::read_to_string(&path)
        .map_err(|e| CliError::Chart(format!("{}: {e}", path.display())))?;
    serde_yaml::from_str(&text).map_err(|e| CliError::Chart(format!("{}: {e}", path.display())))
}

/// The chart's `version` field
pub fn chart_version(chart_dir: &Path) -> CliResult<String> {
    Ok(read_chart_meta(chart_dir)?.version)
}

/// The chart's `appVersion` field
pub fn chart_app_version(chart_dir: &Path) -> CliResult<String> {
    Ok(read_chart_meta(chart_dir)?.app_version)
}

/// Delegate a chart dependency update to the `helm` binary
pub async fn dependency_update(chart_dir: &Path) -> CliResult<()> {
    let output = tokio::process::Command::new("helm")
        .args(["dependency", "update"])
        .arg(chart_dir)
        .output()
        .await
        .map_err(|e| CliError::Chart(format!("could not run helm: {e}")))?;
    if !output.status.success() {
        return Err(CliError::Chart(format!(
            "helm dependency update failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(())
}
