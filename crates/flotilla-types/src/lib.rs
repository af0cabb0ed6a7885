//! Flotilla Types - Core types for git-driven fleet synchronization
//!
//! Flotilla keeps a fleet of deployable services synchronized with desired
//! state declared in a git-hosted configuration repository and propagates
//! approved changes to a downstream deployment API.
//!
//! ## Architectural Boundaries
//!
//! - **Coordinator** owns: record creation/removal, desired facts, the
//!   revision gate over the watched source repository
//! - **Agent** owns: draining pending flags against the deployment API and
//!   the `safe_to_delete` / `last_setup_status` fields
//! - The [`record::ServiceRecord`] is the only object shared between them;
//!   its pending flags are a mailbox, deposited by the coordinator and
//!   drained by the agent.
//!
//! ## Key Concepts
//!
//! - **DesiredStateSnapshot**: immutable result of parsing the configuration
//!   repository at one commit
//! - **ServiceRecord**: persistent per-service coordination object
//! - **ProjectState**: last source revision a coordinator pass fully absorbed
//! - **Events**: unified observability stream for both reconcilers

pub mod events;
pub mod project;
pub mod record;
pub mod snapshot;

pub use events::{EventSeverity, EventSource, FlotillaEvent, FlotillaEventEnvelope};
pub use project::ProjectState;
pub use record::{LifecyclePhase, RecordKey, ServiceRecord};
pub use snapshot::{
    DeploymentMetadata, DesiredStateSnapshot, ServiceDeclaration, Shipyard, ShipyardStage,
    SourceRevision,
};
