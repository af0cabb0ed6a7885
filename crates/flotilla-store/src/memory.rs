//! In-memory store for development and testing

use crate::error::{Result, StoreError};
use crate::traits::{ProjectStateStore, RecordStore, Versioned};
use async_trait::async_trait;
use flotilla_types::{ProjectState, RecordKey, ServiceRecord};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-memory versioned store.
///
/// Versions start at 1 and increment on every successful write, per object.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: RwLock<HashMap<RecordKey, Versioned<ServiceRecord>>>,
    projects: RwLock<HashMap<String, Versioned<ProjectState>>>,
}

impl InMemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn get_record(&self, key: &RecordKey) -> Result<Option<Versioned<ServiceRecord>>> {
        let records = self.records.read().await;
        Ok(records.get(key).cloned())
    }

    async fn list_records(&self, project: &str) -> Result<Vec<Versioned<ServiceRecord>>> {
        let records = self.records.read().await;
        let mut listed: Vec<_> = records
            .values()
            .filter(|r| r.value.project == project)
            .cloned()
            .collect();
        listed.sort_by(|a, b| a.value.service.cmp(&b.value.service));
        Ok(listed)
    }

    async fn create_record(&self, record: ServiceRecord) -> Result<Versioned<ServiceRecord>> {
        let mut records = self.records.write().await;
        let key = record.key();
        if let Some(existing) = records.get(&key) {
            return Ok(existing.clone());
        }
        let stored = Versioned::new(1, record);
        records.insert(key, stored.clone());
        Ok(stored)
    }

    async fn update_record(
        &self,
        current: Versioned<ServiceRecord>,
    ) -> Result<Versioned<ServiceRecord>> {
        let mut records = self.records.write().await;
        let key = current.value.key();
        let stored = records
            .get(&key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        if stored.version != current.version {
            return Err(StoreError::VersionConflict {
                key: key.to_string(),
                expected: current.version,
                actual: stored.version,
            });
        }
        let updated = Versioned::new(current.version + 1, current.value);
        records.insert(key, updated.clone());
        Ok(updated)
    }

    async fn remove_record(&self, key: &RecordKey, version: u64) -> Result<bool> {
        let mut records = self.records.write().await;
        match records.get(key) {
            None => Ok(false),
            Some(stored) if stored.version != version => Err(StoreError::VersionConflict {
                key: key.to_string(),
                expected: version,
                actual: stored.version,
            }),
            Some(_) => {
                records.remove(key);
                Ok(true)
            }
        }
    }
}

#[async_trait]
impl ProjectStateStore for InMemoryStore {
    async fn get_project_state(&self, project: &str) -> Result<Option<Versioned<ProjectState>>> {
        let projects = self.projects.read().await;
        Ok(projects.get(project).cloned())
    }

    async fn put_project_state(
        &self,
        state: ProjectState,
        expected_version: Option<u64>,
    ) -> Result<Versioned<ProjectState>> {
        let mut projects = self.projects.write().await;
        let actual = projects.get(&state.project).map(|s| s.version);
        if actual != expected_version {
            return Err(StoreError::VersionConflict {
                key: state.project.clone(),
                expected: expected_version.unwrap_or(0),
                actual: actual.unwrap_or(0),
            });
        }
        let stored = Versioned::new(expected_version.unwrap_or(0) + 1, state);
        projects.insert(stored.value.project.clone(), stored.clone());
        Ok(stored)
    }
}
