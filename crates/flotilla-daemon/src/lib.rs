//! Flotilla Daemon library
//!
//! Core components of `flotillad`:
//! - Configuration loading with serde defaults and CLI/env overrides
//! - The scheduler: a per-project poll-and-requeue loop dispatching
//!   coordinator and agent passes
//! - Error taxonomy for a single pass

pub mod config;
pub mod error;
pub mod scheduler;

pub use config::{ApiConfig, DaemonConfig, ProjectConfig, SchedulerConfig};
pub use error::{DaemonError, DaemonResult};
pub use scheduler::Scheduler;
