//! Flotilla CLI library
//!
//! Command implementations behind the `flotilla` binary, split out so
//! integration tests can drive them directly.

pub mod chart;
pub mod commands;
pub mod config;
pub mod error;
pub mod fsutil;

pub use error::{CliError, CliResult};
