//! Storage trait definitions

use crate::error::Result;
use async_trait::async_trait;
use flotilla_types::{ProjectState, RecordKey, ServiceRecord};
use serde::{Deserialize, Serialize};

/// An object together with the store version it was read at.
///
/// The version is opaque to callers; it is passed back on update so the
/// store can reject writes based on stale reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Versioned<T> {
    /// Store version of the wrapped value
    pub version: u64,

    /// The stored value
    pub value: T,
}

impl<T> Versioned<T> {
    pub fn new(version: u64, value: T) -> Self {
        Self { version, value }
    }

    /// Map the value, keeping the version
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Versioned<U> {
        Versioned {
            version: self.version,
            value: f(self.value),
        }
    }
}

/// Storage for service records
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Get a record by key
    async fn get_record(&self, key: &RecordKey) -> Result<Option<Versioned<ServiceRecord>>>;

    /// List all records of a project
    async fn list_records(&self, project: &str) -> Result<Vec<Versioned<ServiceRecord>>>;

    /// Create a record if absent; an existing record is returned untouched
    /// (creation is get-or-create, never an unconditional insert)
    async fn create_record(&self, record: ServiceRecord) -> Result<Versioned<ServiceRecord>>;

    /// Compare-and-swap update: fails with `VersionConflict` unless the
    /// stored version equals `current.version`. Returns the new version.
    async fn update_record(
        &self,
        current: Versioned<ServiceRecord>,
    ) -> Result<Versioned<ServiceRecord>>;

    /// Physically remove a record, guarded by the version it was read at.
    /// Returns whether anything was removed.
    async fn remove_record(&self, key: &RecordKey, version: u64) -> Result<bool>;
}

/// Storage for per-project reconciliation state
#[async_trait]
pub trait ProjectStateStore: Send + Sync {
    /// Get the state of a project
    async fn get_project_state(&self, project: &str) -> Result<Option<Versioned<ProjectState>>>;

    /// Compare-and-swap write. `expected_version` is `None` for the first
    /// write of a project and `Some` of the version read otherwise.
    async fn put_project_state(
        &self,
        state: ProjectState,
        expected_version: Option<u64>,
    ) -> Result<Versioned<ProjectState>>;
}

/// Combined storage trait
pub trait Store: RecordStore + ProjectStateStore {}

impl<T: RecordStore + ProjectStateStore> Store for T {}
