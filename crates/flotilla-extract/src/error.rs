//! Error types for desired-state extraction

use std::path::PathBuf;
use thiserror::Error;

/// Extraction error type. All variants are fatal for the current pass;
/// the next pass retries from the latest source.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The operator configuration file is absent
    #[error("no operator configuration at {path}")]
    MissingConfig { path: PathBuf },

    /// The shipyard file is absent
    #[error("no shipyard at {path}")]
    MissingShipyard { path: PathBuf },

    /// An explicit stage override names a stage absent from the shipyard
    #[error("stage '{stage}' not found in shipyard")]
    StageNotFound { stage: String },

    /// An explicit sequence override is absent from the selected stage
    #[error("sequence '{sequence}' not found in stage '{stage}'")]
    SequenceNotFound { sequence: String, stage: String },

    /// The shipyard defines no stages at all
    #[error("no stage defined in shipyard")]
    NoStagesDefined,

    /// The relevant stage defines no sequences
    #[error("no sequence defined in stage '{stage}'")]
    NoSequencesDefined { stage: String },

    /// A service name appears more than once in the declaration list
    #[error("service '{service}' declared more than once")]
    DuplicateService { service: String },

    /// A configuration file could not be parsed
    #[error("could not parse {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Filesystem failure while reading the tree
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for extraction operations
pub type Result<T> = std::result::Result<T, ExtractError>;
