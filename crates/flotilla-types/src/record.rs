//! Per-service coordination records
//!
//! A [`ServiceRecord`] is the persistent coordination object shared by the
//! project coordinator and the service agent. The coordinator deposits work
//! by raising pending flags and updating desired facts; the agent drains the
//! flags by calling the deployment API and clears each one only after the
//! corresponding remote call succeeded. A record must stay meaningful when
//! observed with any combination of flags set: the agent applies them in a
//! fixed priority order.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a service record: project plus service name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordKey {
    pub project: String,
    pub service: String,
}

impl RecordKey {
    pub fn new(project: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            service: service.into(),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.project, self.service)
    }
}

/// Dominant lifecycle phase of a record, by the agent's priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecyclePhase {
    /// Service must still be registered with the deployment API
    CreationPending,
    /// A deployment trigger is owed
    DeploymentPending,
    /// Remote deletion is owed
    DeletionPending,
    /// Remote deletion confirmed; the record may be physically removed
    SafeToDelete,
    /// No action owed
    Stable,
}

/// Persistent per-service coordination object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    /// Owning project, immutable after creation
    pub project: String,

    /// Service name, immutable after creation
    pub service: String,

    /// Version that should now run, resolved from the service's published
    /// deployment metadata
    #[serde(default)]
    pub desired_version: String,

    /// Author of the source commit behind `desired_version`
    #[serde(default)]
    pub last_author: String,

    /// Source commit hash behind `desired_version`
    #[serde(default)]
    pub last_source_commit_hash: String,

    /// Stage deployments of this service start in
    #[serde(default)]
    pub start_stage: String,

    /// Event type posted to trigger a deployment
    #[serde(default)]
    pub trigger_command: String,

    /// The service must still be registered with the deployment API
    #[serde(default)]
    pub creation_pending: bool,

    /// A deployment trigger is owed
    #[serde(default)]
    pub deployment_pending: bool,

    /// Remote deletion is owed
    #[serde(default)]
    pub deletion_pending: bool,

    /// Set by the agent once remote deletion succeeded; the record is then a
    /// tombstone the coordinator may physically remove
    #[serde(default)]
    pub safe_to_delete: bool,

    /// Last HTTP status observed while registering the service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_setup_status: Option<u16>,

    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl ServiceRecord {
    /// Fresh record for a newly declared service, owing its registration
    pub fn new(project: impl Into<String>, service: impl Into<String>) -> Self {
        let now = chrono::Utc::now();
        Self {
            project: project.into(),
            service: service.into(),
            desired_version: String::new(),
            last_author: String::new(),
            last_source_commit_hash: String::new(),
            start_stage: String::new(),
            trigger_command: String::new(),
            creation_pending: true,
            deployment_pending: false,
            deletion_pending: false,
            safe_to_delete: false,
            last_setup_status: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.project.clone(), self.service.clone())
    }

    /// Dominant phase, following the agent's fixed priority:
    /// creation, then deployment, then deletion.
    pub fn phase(&self) -> LifecyclePhase {
        if self.creation_pending {
            LifecyclePhase::CreationPending
        } else if self.deployment_pending {
            LifecyclePhase::DeploymentPending
        } else if self.safe_to_delete {
            LifecyclePhase::SafeToDelete
        } else if self.deletion_pending {
            LifecyclePhase::DeletionPending
        } else {
            LifecyclePhase::Stable
        }
    }

    /// Whether any action is owed to the deployment API
    pub fn has_pending_work(&self) -> bool {
        self.creation_pending
            || self.deployment_pending
            || (self.deletion_pending && !self.safe_to_delete)
    }

    /// Stamp a mutation time; callers do this before persisting
    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_owes_creation() {
        let record = ServiceRecord::new("sockshop", "carts");
        assert_eq!(record.phase(), LifecyclePhase::CreationPending);
        assert!(record.has_pending_work());
    }

    #[test]
    fn test_phase_priority_creation_before_deployment() {
        let mut record = ServiceRecord::new("sockshop", "carts");
        record.deployment_pending = true;
        assert_eq!(record.phase(), LifecyclePhase::CreationPending);
        record.creation_pending = false;
        assert_eq!(record.phase(), LifecyclePhase::DeploymentPending);
    }

    #[test]
    fn test_tombstone_has_no_pending_work() {
        let mut record = ServiceRecord::new("sockshop", "carts");
        record.creation_pending = false;
        record.deletion_pending = true;
        assert!(record.has_pending_work());
        record.safe_to_delete = true;
        assert_eq!(record.phase(), LifecyclePhase::SafeToDelete);
        assert!(!record.has_pending_work());
    }

    #[test]
    fn test_stable_record() {
        let mut record = ServiceRecord::new("sockshop", "carts");
        record.creation_pending = false;
        assert_eq!(record.phase(), LifecyclePhase::Stable);
        assert!(!record.has_pending_work());
    }

    #[test]
    fn test_record_key_display() {
        let key = RecordKey::new("sockshop", "carts");
        assert_eq!(key.to_string(), "sockshop/carts");
    }
}
