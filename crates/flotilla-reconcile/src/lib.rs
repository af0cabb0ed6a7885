//! Flotilla Reconcile - The two-level reconciliation state machine
//!
//! Two re-entrant reconcilers share the service records in the store:
//!
//! - [`ProjectCoordinator`] turns a desired-state snapshot into per-service
//!   lifecycle work: it creates missing records, marks removed services for
//!   deletion, and — only when the watched source revision actually
//!   advanced — requests redeployments.
//! - [`ServiceAgent`] drains one record's pending flags against the
//!   deployment API in a fixed priority order, clearing each flag strictly
//!   after the corresponding remote call succeeded.
//!
//! Both reconcilers may be re-invoked at any point after a completed pass,
//! and must tolerate observing records mid-transition; every operation is a
//! get-or-create, a flag-gated action, or a monotonic version check.

pub mod agent;
pub mod context;
pub mod coordinator;
pub mod error;

pub use agent::ServiceAgent;
pub use context::PassContext;
pub use coordinator::ProjectCoordinator;
pub use error::{ReconcileError, Result};
