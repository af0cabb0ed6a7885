//! Configuration-repository file formats
//!
//! Three files matter: `shipyard.yaml` at the root (stage/sequence graph),
//! `.keptn/config.yaml` (operator service list plus `initbranch`), and
//! `base/<service>/metadata/deployment.yaml` (per-service deployment
//! metadata written at publish time).

use crate::error::{ExtractError, Result};
use flotilla_types::{DeploymentMetadata, ServiceDeclaration, Shipyard, ShipyardStage};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Shipyard file name at the repository root
pub const SHIPYARD_FILE: &str = "shipyard.yaml";

/// Operator configuration path relative to the repository root
pub const OPERATOR_CONFIG_FILE: &str = ".keptn/config.yaml";

/// Deployment metadata path for one service
pub fn deployment_metadata_path(root: &Path, service: &str) -> PathBuf {
    root.join("base").join(service).join("metadata/deployment.yaml")
}

/// Parsed `.keptn/config.yaml`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperatorConfig {
    /// Default stage override for every service of the project
    pub init_branch: Option<String>,

    /// Ordered service declarations
    pub services: Vec<ServiceDeclaration>,
}

impl OperatorConfig {
    /// Insert or replace the declaration for `service.name`, keeping
    /// declaration order for existing entries.
    pub fn upsert_service(&mut self, service: ServiceDeclaration) {
        match self.services.iter_mut().find(|s| s.name == service.name) {
            Some(existing) => *existing = service,
            None => self.services.push(service),
        }
    }

    /// Drop the declaration for `name`; returns whether one was present.
    pub fn remove_service(&mut self, name: &str) -> bool {
        let before = self.services.len();
        self.services.retain(|s| s.name != name);
        self.services.len() != before
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct OperatorConfigFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata: Option<OperatorConfigMeta>,
    #[serde(default)]
    services: Vec<ServiceDeclaration>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct OperatorConfigMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    initbranch: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ShipyardFile {
    #[serde(default)]
    spec: ShipyardSpec,
}

#[derive(Debug, Default, Deserialize)]
struct ShipyardSpec {
    #[serde(default)]
    stages: Vec<ShipyardStageFile>,
}

#[derive(Debug, Deserialize)]
struct ShipyardStageFile {
    name: String,
    #[serde(default)]
    sequences: Vec<ShipyardSequenceFile>,
}

#[derive(Debug, Deserialize)]
struct ShipyardSequenceFile {
    name: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct DeploymentManifestFile {
    #[serde(default)]
    metadata: DeploymentMetadata,
}

fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path).map_err(|source| ExtractError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&text).map_err(|source| ExtractError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

/// Read and flatten `shipyard.yaml`
pub fn read_shipyard(root: &Path) -> Result<Shipyard> {
    let path = root.join(SHIPYARD_FILE);
    if !path.exists() {
        return Err(ExtractError::MissingShipyard { path });
    }
    let file: ShipyardFile = read_yaml(&path)?;
    Ok(Shipyard {
        stages: file
            .spec
            .stages
            .into_iter()
            .map(|stage| ShipyardStage {
                name: stage.name,
                sequences: stage.sequences.into_iter().map(|s| s.name).collect(),
            })
            .collect(),
    })
}

/// Read `.keptn/config.yaml`
pub fn read_operator_config(root: &Path) -> Result<OperatorConfig> {
    let path = root.join(OPERATOR_CONFIG_FILE);
    if !path.exists() {
        return Err(ExtractError::MissingConfig { path });
    }
    let file: OperatorConfigFile = read_yaml(&path)?;
    Ok(OperatorConfig {
        init_branch: file.metadata.and_then(|m| m.initbranch),
        services: file.services,
    })
}

/// Write `.keptn/config.yaml`, creating the directory when needed
pub fn write_operator_config(root: &Path, config: &OperatorConfig) -> Result<()> {
    let dir = root.join(".keptn");
    std::fs::create_dir_all(&dir).map_err(|source| ExtractError::Io {
        path: dir.clone(),
        source,
    })?;

    let file = OperatorConfigFile {
        metadata: config.init_branch.clone().map(|initbranch| OperatorConfigMeta {
            initbranch: Some(initbranch),
        }),
        services: config.services.clone(),
    };
    let path = root.join(OPERATOR_CONFIG_FILE);
    let text = serde_yaml::to_string(&file).map_err(|source| ExtractError::Malformed {
        path: path.clone(),
        source,
    })?;
    std::fs::write(&path, text).map_err(|source| ExtractError::Io { path, source })
}

/// Read a service's deployment metadata manifest.
///
/// An absent manifest means the service never published a version and yields
/// empty metadata; a malformed one is an error.
pub fn read_deployment_metadata(root: &Path, service: &str) -> Result<DeploymentMetadata> {
    let path = deployment_metadata_path(root, service);
    if !path.exists() {
        tracing::debug!(service, "no version information manifest");
        return Ok(DeploymentMetadata::default());
    }
    let file: DeploymentManifestFile = read_yaml(&path)?;
    Ok(file.metadata)
}

/// Write a service's deployment metadata manifest, creating directories
pub fn write_deployment_metadata(
    root: &Path,
    service: &str,
    metadata: &DeploymentMetadata,
) -> Result<()> {
    let dir = root.join("base").join(service).join("metadata");
    std::fs::create_dir_all(&dir).map_err(|source| ExtractError::Io {
        path: dir.clone(),
        source,
    })?;
    let path = dir.join("deployment.yaml");

    let file = DeploymentManifestFile {
        metadata: metadata.clone(),
    };
    let text = serde_yaml::to_string(&file).map_err(|source| ExtractError::Malformed {
        path: path.clone(),
        source,
    })?;
    std::fs::write(&path, text).map_err(|source| ExtractError::Io { path, source })
}
