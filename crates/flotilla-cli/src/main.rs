//! flotilla - Publish-side CLI
//!
//! Copies service configuration from a CI workspace into the fleet
//! configuration repository, enriches it with deployment metadata, and
//! publishes the change with optimistic-concurrency retry. The daemon picks
//! the commit up and drives the deployment API.

use clap::{Parser, Subcommand};
use flotilla_cli::commands::{delete_service, trigger_deploy};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Flotilla CLI application
#[derive(Parser)]
#[command(name = "flotilla")]
#[command(about = "Flotilla - publish service configuration to the fleet repository", long_about = None)]
#[command(version)]
struct Cli {
    /// Log level
    #[arg(long, env = "FLOTILLA_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Push configuration files and trigger a deployment through the
    /// reconciliation daemon
    TriggerDeployment(trigger_deploy::TriggerDeployArgs),

    /// Delete a service's configuration files and trigger its removal
    DeleteService(delete_service::DeleteServiceArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_level.clone().into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::TriggerDeployment(args) => trigger_deploy::run(args).await?,
        Commands::DeleteService(args) => delete_service::run(args).await?,
    }
    Ok(())
}
