//! Flotilla Extract - Desired state from a committed configuration tree
//!
//! Reads the file formats of the configuration repository — the shipyard
//! stage/sequence graph, the operator service list, and per-service
//! deployment metadata manifests — and assembles an immutable
//! [`flotilla_types::DesiredStateSnapshot`] for one commit.

pub mod error;
pub mod files;
pub mod resolve;

pub use error::{ExtractError, Result};
pub use files::{
    read_deployment_metadata, read_operator_config, read_shipyard, write_deployment_metadata,
    write_operator_config, OperatorConfig,
};
pub use resolve::resolve_stage_and_sequence;

use flotilla_types::{DesiredStateSnapshot, SourceRevision};
use std::collections::BTreeMap;
use std::path::Path;

/// Extract the desired-state snapshot from the file tree at `root`,
/// committed at `tip`.
///
/// Fails when the operator configuration or shipyard is missing or
/// malformed, when a service name is declared twice, or when a service's
/// explicit stage override names a stage absent from the shipyard.
pub fn extract(root: &Path, tip: SourceRevision) -> Result<DesiredStateSnapshot> {
    let shipyard = read_shipyard(root)?;
    let config = read_operator_config(root)?;

    let mut metadata = BTreeMap::new();
    for service in &config.services {
        if config
            .services
            .iter()
            .filter(|s| s.name == service.name)
            .count()
            > 1
        {
            return Err(ExtractError::DuplicateService {
                service: service.name.clone(),
            });
        }
        if let Some(stage) = service.stage.as_deref().filter(|s| !s.is_empty()) {
            if shipyard.stage(stage).is_none() {
                return Err(ExtractError::StageNotFound {
                    stage: stage.to_string(),
                });
            }
        }
        let manifest = read_deployment_metadata(root, &service.name)?;
        if manifest != flotilla_types::DeploymentMetadata::default() {
            metadata.insert(service.name.clone(), manifest);
        }
    }

    tracing::debug!(
        tip = %tip,
        services = config.services.len(),
        stages = shipyard.stages.len(),
        "extracted desired state"
    );

    Ok(DesiredStateSnapshot {
        tip,
        init_branch: config.init_branch,
        shipyard,
        services: config.services,
        metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const SHIPYARD: &str = r#"
apiVersion: spec.keptn.sh/0.2.0
kind: "Shipyard"
metadata:
  name: "test"
spec:
  stages:
    - name: "one"
      sequences:
        - name: "rick"
        - name: "astley"
    - name: "two"
      sequences:
        - name: "paul"
"#;

    const OPERATOR_CONFIG: &str = r#"
metadata:
  initbranch: "alderan"
services:
  - name: "death-star-as-a-service"
    triggerevent: "sh.keptn.event.alderan.delivery.triggered"
  - name: "mega-maid-as-a-service"
    triggerevent: "sh.keptn.event.alderan.delivery.triggered"
"#;

    fn write_tree(shipyard: &str, config: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("shipyard.yaml"), shipyard).unwrap();
        fs::create_dir_all(dir.path().join(".keptn")).unwrap();
        fs::write(dir.path().join(".keptn/config.yaml"), config).unwrap();
        dir
    }

    #[test]
    fn test_extract_assembles_snapshot() {
        let dir = write_tree(SHIPYARD, OPERATOR_CONFIG);
        let snap = extract(dir.path(), SourceRevision::new("abc")).unwrap();

        assert_eq!(snap.init_branch.as_deref(), Some("alderan"));
        assert_eq!(snap.services.len(), 2);
        assert_eq!(snap.shipyard.stages.len(), 2);
        assert_eq!(snap.services[0].name, "death-star-as-a-service");
        assert!(snap.metadata.get("death-star-as-a-service").is_none());
    }

    #[test]
    fn test_extract_reads_deployment_metadata() {
        let dir = write_tree(SHIPYARD, OPERATOR_CONFIG);
        let meta_dir = dir.path().join("base/death-star-as-a-service/metadata");
        fs::create_dir_all(&meta_dir).unwrap();
        fs::write(
            meta_dir.join("deployment.yaml"),
            "metadata:\n  imageVersion: \"1.2.3\"\n  gitCommit: \"cafe\"\n  author: \"vader@empire.gov\"\n",
        )
        .unwrap();

        let snap = extract(dir.path(), SourceRevision::new("abc")).unwrap();
        let meta = snap.deployment_metadata("death-star-as-a-service");
        assert_eq!(meta.image_version, "1.2.3");
        assert_eq!(meta.git_commit, "cafe");
        assert_eq!(meta.author, "vader@empire.gov");
    }

    #[test]
    fn test_extract_rejects_duplicate_service_names() {
        let config = r#"
services:
  - name: "carts"
    triggerevent: "a"
  - name: "carts"
    triggerevent: "b"
"#;
        let dir = write_tree(SHIPYARD, config);
        let err = extract(dir.path(), SourceRevision::new("abc")).unwrap_err();
        assert!(matches!(err, ExtractError::DuplicateService { service } if service == "carts"));
    }

    #[test]
    fn test_extract_rejects_unknown_stage_override() {
        let config = r#"
services:
  - name: "carts"
    triggerevent: "a"
    stage: "nonexistent"
"#;
        let dir = write_tree(SHIPYARD, config);
        let err = extract(dir.path(), SourceRevision::new("abc")).unwrap_err();
        assert!(matches!(err, ExtractError::StageNotFound { stage } if stage == "nonexistent"));
    }

    #[test]
    fn test_extract_requires_operator_config() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("shipyard.yaml"), SHIPYARD).unwrap();
        let err = extract(dir.path(), SourceRevision::new("abc")).unwrap_err();
        assert!(matches!(err, ExtractError::MissingConfig { .. }));
    }
}
