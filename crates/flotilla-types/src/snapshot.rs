//! Desired-state snapshot types
//!
//! A snapshot is the immutable result of parsing the configuration
//! repository at one commit: the shipyard stage/sequence graph, the ordered
//! service declarations, and each service's published deployment metadata.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A git commit hash identifying one revision of the configuration repository
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRevision(String);

impl SourceRevision {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One service as declared in the operator configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDeclaration {
    /// Service name, unique within a snapshot
    pub name: String,

    /// Event type posted to the deployment API to trigger a deployment,
    /// e.g. `sh.keptn.event.<stage>.<sequence>.triggered`
    #[serde(rename = "triggerevent")]
    pub deployment_trigger: String,

    /// Explicit stage override; defaults to the first shipyard stage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,

    /// Directory the service's chart is copied from at publish time
    #[serde(rename = "chart_base", default, skip_serializing_if = "Option::is_none")]
    pub chart_base: Option<String>,

    /// Run a chart dependency update before publishing
    #[serde(rename = "updateHelmDependencies", default, skip_serializing_if = "is_false")]
    pub update_helm_dependencies: bool,

    /// Resolve the image version from the chart's `version` field
    #[serde(rename = "useChartVersion", default, skip_serializing_if = "is_false")]
    pub use_chart_version: bool,

    /// Resolve the image version from the chart's `appVersion` field
    #[serde(rename = "useChartAppVersion", default, skip_serializing_if = "is_false")]
    pub use_chart_app_version: bool,

    /// Swallow duplicate-tag push conflicts for this service
    #[serde(rename = "ignoreDuplicateGitTag", default, skip_serializing_if = "is_false")]
    pub ignore_duplicate_git_tag: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl ServiceDeclaration {
    /// Minimal declaration with only name and trigger event set
    pub fn new(name: impl Into<String>, deployment_trigger: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            deployment_trigger: deployment_trigger.into(),
            stage: None,
            chart_base: None,
            update_helm_dependencies: false,
            use_chart_version: false,
            use_chart_app_version: false,
            ignore_duplicate_git_tag: false,
        }
    }
}

/// One stage of the shipyard pipeline, with its ordered sequence names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipyardStage {
    pub name: String,
    pub sequences: Vec<String>,
}

/// Ordered pipeline definition parsed from `shipyard.yaml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shipyard {
    pub stages: Vec<ShipyardStage>,
}

impl Shipyard {
    /// Look up a stage by name
    pub fn stage(&self, name: &str) -> Option<&ShipyardStage> {
        self.stages.iter().find(|s| s.name == name)
    }
}

/// Per-service deployment metadata, written at publish time under
/// `base/<service>/metadata/deployment.yaml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentMetadata {
    /// Image version that should now run
    #[serde(rename = "imageVersion", default)]
    pub image_version: String,

    /// Commit hash of the source repository the version was built from
    #[serde(rename = "gitCommit", default)]
    pub git_commit: String,

    /// Author of that source commit
    #[serde(default)]
    pub author: String,
}

/// Immutable desired state extracted from one committed file tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredStateSnapshot {
    /// Commit hash the snapshot was extracted at
    pub tip: SourceRevision,

    /// Default stage override from the operator configuration metadata
    pub init_branch: Option<String>,

    /// Stage/sequence graph
    pub shipyard: Shipyard,

    /// Ordered service declarations
    pub services: Vec<ServiceDeclaration>,

    /// Deployment metadata per service name; services without a published
    /// manifest are absent
    pub metadata: BTreeMap<String, DeploymentMetadata>,
}

impl DesiredStateSnapshot {
    /// Declaration for a service name, if present
    pub fn service(&self, name: &str) -> Option<&ServiceDeclaration> {
        self.services.iter().find(|s| s.name == name)
    }

    /// Whether a service name is declared in this snapshot
    pub fn contains(&self, name: &str) -> bool {
        self.service(name).is_some()
    }

    /// Deployment metadata for a service; empty metadata when the service
    /// never published a manifest
    pub fn deployment_metadata(&self, name: &str) -> DeploymentMetadata {
        self.metadata.get(name).cloned().unwrap_or_default()
    }

    /// The stage a service's deployments start in: the snapshot-wide
    /// `init_branch` override wins, then the declaration's own stage, then
    /// the first shipyard stage.
    pub fn start_stage(&self, declaration: &ServiceDeclaration) -> Option<String> {
        if let Some(branch) = &self.init_branch {
            if !branch.is_empty() {
                return Some(branch.clone());
            }
        }
        if let Some(stage) = &declaration.stage {
            if !stage.is_empty() {
                return Some(stage.clone());
            }
        }
        self.shipyard.stages.first().map(|s| s.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shipyard() -> Shipyard {
        Shipyard {
            stages: vec![
                ShipyardStage {
                    name: "one".into(),
                    sequences: vec!["rick".into(), "astley".into()],
                },
                ShipyardStage {
                    name: "two".into(),
                    sequences: vec!["paul".into()],
                },
            ],
        }
    }

    fn snapshot(init_branch: Option<&str>) -> DesiredStateSnapshot {
        DesiredStateSnapshot {
            tip: SourceRevision::new("abc123"),
            init_branch: init_branch.map(Into::into),
            shipyard: shipyard(),
            services: vec![ServiceDeclaration::new(
                "carts",
                "sh.keptn.event.one.rick.triggered",
            )],
            metadata: BTreeMap::new(),
        }
    }

    #[test]
    fn test_start_stage_defaults_to_first_shipyard_stage() {
        let snap = snapshot(None);
        let decl = snap.service("carts").unwrap().clone();
        assert_eq!(snap.start_stage(&decl), Some("one".into()));
    }

    #[test]
    fn test_start_stage_prefers_init_branch() {
        let snap = snapshot(Some("hotfix"));
        let mut decl = snap.service("carts").unwrap().clone();
        decl.stage = Some("two".into());
        assert_eq!(snap.start_stage(&decl), Some("hotfix".into()));
    }

    #[test]
    fn test_start_stage_uses_declared_stage_without_init_branch() {
        let snap = snapshot(None);
        let mut decl = snap.service("carts").unwrap().clone();
        decl.stage = Some("two".into());
        assert_eq!(snap.start_stage(&decl), Some("two".into()));
    }

    #[test]
    fn test_deployment_metadata_defaults_to_empty() {
        let snap = snapshot(None);
        let meta = snap.deployment_metadata("carts");
        assert!(meta.image_version.is_empty());
        assert!(meta.author.is_empty());
    }

    #[test]
    fn test_service_declaration_yaml_field_names() {
        let yaml = r#"
name: "carts"
triggerevent: "sh.keptn.event.dev.delivery.triggered"
chart_base: "helm/carts"
useChartAppVersion: true
"#;
        let decl: ServiceDeclaration = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(decl.name, "carts");
        assert_eq!(decl.deployment_trigger, "sh.keptn.event.dev.delivery.triggered");
        assert_eq!(decl.chart_base.as_deref(), Some("helm/carts"));
        assert!(decl.use_chart_app_version);
        assert!(!decl.use_chart_version);
    }
}
