//! flotillad - Background reconciliation daemon
//!
//! Watches git-hosted configuration repositories and keeps the deployment
//! API synchronized with the desired state they declare.

use clap::Parser;
use flotilla_daemon::{DaemonConfig, Scheduler};
use flotilla_store::InMemoryStore;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Flotilla daemon CLI
#[derive(Parser)]
#[command(name = "flotillad")]
#[command(about = "Flotilla - git-driven fleet reconciliation daemon", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "FLOTILLA_CONFIG")]
    config: Option<String>,

    /// Deployment API endpoint, overriding the configuration file
    #[arg(long, env = "FLOTILLA_API_ENDPOINT")]
    api_endpoint: Option<String>,

    /// Deployment API token, overriding the configuration file
    #[arg(long, env = "FLOTILLA_API_TOKEN")]
    api_token: Option<String>,

    /// Log level
    #[arg(long, env = "FLOTILLA_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "FLOTILLA_LOG_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_level.clone().into());
    if cli.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let mut config = DaemonConfig::load(cli.config.as_deref())?;
    if let Some(endpoint) = cli.api_endpoint {
        config.api.endpoint = endpoint;
    }
    if let Some(token) = cli.api_token {
        config.api.token = token;
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        api = %config.api.endpoint,
        projects = config.projects.len(),
        "flotillad starting"
    );
    if config.projects.is_empty() {
        tracing::warn!("no projects configured; the daemon will idle");
    }

    let store = Arc::new(InMemoryStore::new());
    let scheduler = Scheduler::new(config, store)?;

    let runner = tokio::spawn(scheduler.clone().start());
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested");
    scheduler.stop();
    runner.await?;

    Ok(())
}
