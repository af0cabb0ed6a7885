//! Event types for flotilla observability
//!
//! Events provide a unified stream of reconciliation and publish activity.

use crate::record::RecordKey;
use crate::snapshot::SourceRevision;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope wrapping all flotilla events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlotillaEventEnvelope {
    /// Unique event ID
    pub id: Uuid,

    /// Event timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,

    /// Component that emitted the event
    pub source: EventSource,

    /// Event severity
    pub severity: EventSeverity,

    /// The actual event
    pub event: FlotillaEvent,
}

impl FlotillaEventEnvelope {
    pub fn new(event: FlotillaEvent, source: EventSource, severity: EventSeverity) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
            source,
            severity,
            event,
        }
    }
}

/// Event sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSource {
    /// Project coordinator
    Coordinator,
    /// Service agent
    Agent,
    /// Scheduler
    Scheduler,
}

/// Event severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level event
    Debug,
    /// Informational event
    Info,
    /// Warning event
    Warning,
    /// Error event
    Error,
}

/// Flotilla events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FlotillaEvent {
    /// A record was created for a newly declared service
    RecordCreated { key: RecordKey },

    /// A record was marked for deletion after its service left the snapshot
    MarkedForDeletion { key: RecordKey },

    /// A tombstone record was physically removed
    RecordRemoved { key: RecordKey },

    /// The coordinator requested a redeployment
    RedeployRequested { key: RecordKey, version: String },

    /// The watched source revision advanced
    SourceAdvanced {
        project: String,
        from: Option<SourceRevision>,
        to: SourceRevision,
    },

    /// The agent registered the service with the deployment API
    ServiceRegistered { key: RecordKey, status: u16 },

    /// The agent triggered a deployment
    DeploymentTriggered {
        key: RecordKey,
        version: String,
        stage: String,
    },

    /// The agent deleted the service from the deployment API
    ServiceDeleted { key: RecordKey },

    /// A reconciliation pass failed and will be retried
    PassFailed { object: String, reason: String },
}
