//! Poll-and-requeue scheduler
//!
//! One loop per watched project. Each cycle probes the remote head, clones
//! the configuration repository into a scratch directory, extracts the
//! desired-state snapshot, runs a coordinator pass, and then dispatches an
//! agent pass for every record with pending work. A failed cycle ends with
//! a shorter requeue delay instead of crashing; the pending flags in the
//! store are the durable memory of unfinished work.

use crate::config::{DaemonConfig, ProjectConfig};
use crate::error::DaemonResult;
use flotilla_deploy::ApiClient;
use flotilla_git::GitRemote;
use flotilla_reconcile::{PassContext, ProjectCoordinator, ServiceAgent};
use flotilla_store::{RecordStore, Store};
use flotilla_types::{EventSeverity, EventSource, FlotillaEvent, FlotillaEventEnvelope};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};

/// Scheduler state shared by all project loops
pub struct Scheduler {
    config: DaemonConfig,
    store: Arc<dyn Store>,
    api: Arc<ApiClient>,
    event_tx: broadcast::Sender<FlotillaEventEnvelope>,
    shutdown_tx: watch::Sender<bool>,
}

impl Scheduler {
    /// Create a scheduler over `store`, building the API client from the
    /// daemon configuration.
    pub fn new(config: DaemonConfig, store: Arc<dyn Store>) -> DaemonResult<Arc<Self>> {
        let api = Arc::new(ApiClient::new(
            config.api.endpoint.clone(),
            config.api.token.clone(),
            Duration::from_secs(config.api.request_timeout_secs),
        )?);
        let (event_tx, _) = broadcast::channel(256);
        let (shutdown_tx, _) = watch::channel(false);
        Ok(Arc::new(Self {
            config,
            store,
            api,
            event_tx,
            shutdown_tx,
        }))
    }

    /// Subscribe to the observability event stream
    pub fn events(&self) -> broadcast::Receiver<FlotillaEventEnvelope> {
        self.event_tx.subscribe()
    }

    /// Spawn one loop per configured project and the event logger; resolves
    /// when every loop exited after [`Scheduler::stop`].
    pub async fn start(self: Arc<Self>) {
        tracing::info!(projects = self.config.projects.len(), "scheduler started");

        let logger = tokio::spawn(log_events(self.event_tx.subscribe()));

        let mut loops = Vec::new();
        for project in self.config.projects.clone() {
            let scheduler = self.clone();
            loops.push(tokio::spawn(async move {
                scheduler.project_loop(project).await;
            }));
        }

        for task in loops {
            let _ = task.await;
        }
        logger.abort();
        tracing::info!("scheduler stopped");
    }

    /// Signal every project loop to exit after its current cycle
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    async fn project_loop(&self, project: ProjectConfig) {
        let poll = Duration::from_secs(self.config.scheduler.poll_interval_secs);
        let retry = Duration::from_secs(self.config.scheduler.retry_interval_secs);
        let mut shutdown = self.shutdown_tx.subscribe();

        loop {
            let delay = match self.project_pass(&project).await {
                Ok(()) => poll,
                Err(err) if err.is_conflict() => {
                    // Lost an optimistic race; the next pass re-reads.
                    tracing::debug!(project = %project.name, error = %err, "pass lost version race");
                    retry
                }
                Err(err) => {
                    tracing::error!(project = %project.name, error = %err, "pass failed");
                    let _ = self.event_tx.send(FlotillaEventEnvelope::new(
                        FlotillaEvent::PassFailed {
                            object: project.name.clone(),
                            reason: err.to_string(),
                        },
                        EventSource::Scheduler,
                        EventSeverity::Error,
                    ));
                    retry
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => {
                    tracing::info!(project = %project.name, "project loop exiting");
                    return;
                }
            }
        }
    }

    /// One full cycle for a project: extract desired state at the remote
    /// tip, run the coordinator, then drain every record with pending work.
    pub async fn project_pass(&self, project: &ProjectConfig) -> DaemonResult<()> {
        let remote = GitRemote::new(
            project.remote_uri.clone(),
            project.user.clone(),
            project.token.clone(),
        )
        .with_timeout(Duration::from_secs(self.config.scheduler.git_timeout_secs));
        let branch = project.effective_branch();

        let tip = remote.remote_head(branch.as_deref()).await?;
        tracing::debug!(project = %project.name, tip = %tip, "probed remote head");

        let scratch = tempfile::tempdir()?;
        let workdir = scratch.path().join("checkout");
        remote.clone_into(&workdir, branch.as_deref()).await?;
        let snapshot = flotilla_extract::extract(&workdir, tip)?;

        let ctx = PassContext::new(project.name.clone(), self.store.clone(), self.event_tx.clone());
        ProjectCoordinator::new().reconcile(&ctx, &snapshot).await?;

        let agent = ServiceAgent::new(self.api.clone());
        for stored in self.store.list_records(&project.name).await? {
            if !stored.value.has_pending_work() {
                continue;
            }
            let key = stored.value.key();
            if let Err(err) = agent.reconcile(&ctx, &key).await {
                // Leave the flag for the next cycle; other records still run.
                tracing::warn!(key = %key, error = %err, "agent pass failed");
                let _ = self.event_tx.send(FlotillaEventEnvelope::new(
                    FlotillaEvent::PassFailed {
                        object: key.to_string(),
                        reason: err.to_string(),
                    },
                    EventSource::Scheduler,
                    EventSeverity::Warning,
                ));
            }
        }

        Ok(())
    }
}

/// Forward observability events into the log stream
async fn log_events(mut rx: broadcast::Receiver<FlotillaEventEnvelope>) {
    loop {
        match rx.recv().await {
            Ok(envelope) => match envelope.severity {
                EventSeverity::Error => {
                    tracing::error!(source = ?envelope.source, event = ?envelope.event, "event")
                }
                EventSeverity::Warning => {
                    tracing::warn!(source = ?envelope.source, event = ?envelope.event, "event")
                }
                _ => tracing::debug!(source = ?envelope.source, event = ?envelope.event, "event"),
            },
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                tracing::warn!(missed, "event logger lagged");
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}
