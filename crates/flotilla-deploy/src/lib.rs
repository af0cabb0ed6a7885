//! Flotilla Deploy - Client for the downstream deployment API
//!
//! The deployment API is the system that actually rolls services out.
//! Flotilla drives three of its surfaces: CloudEvents-shaped trigger events,
//! service registration/deletion on the control plane, and a resource probe
//! used as an existence check. Retry is not handled here — a failed call
//! leaves the caller's pending flag set and the scheduler requeues.

pub mod client;
pub mod error;
pub mod event;

pub use client::{ApiClient, DEFAULT_REQUEST_TIMEOUT};
pub use error::{DeployError, Result};
pub use event::{deployment_labels, EventData, TriggerEvent};
