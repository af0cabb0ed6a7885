//! Per-pass reconciliation context

use flotilla_store::Store;
use flotilla_types::{EventSeverity, EventSource, FlotillaEvent, FlotillaEventEnvelope};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Immutable context for one reconciliation pass.
///
/// Constructed per pass and threaded as a parameter; reconcilers keep no
/// process-wide mutable state of their own.
#[derive(Clone)]
pub struct PassContext {
    /// Project the pass operates on
    pub project: String,

    /// Shared object store holding records and project state
    pub store: Arc<dyn Store>,

    /// Observability event stream
    events: broadcast::Sender<FlotillaEventEnvelope>,
}

impl PassContext {
    pub fn new(
        project: impl Into<String>,
        store: Arc<dyn Store>,
        events: broadcast::Sender<FlotillaEventEnvelope>,
    ) -> Self {
        Self {
            project: project.into(),
            store,
            events,
        }
    }

    /// Context with a throwaway event channel, for tests and one-shot tools
    pub fn detached(project: impl Into<String>, store: Arc<dyn Store>) -> Self {
        let (events, _) = broadcast::channel(64);
        Self::new(project, store, events)
    }

    /// Emit an observability event; delivery is best-effort
    pub fn emit(&self, event: FlotillaEvent, source: EventSource, severity: EventSeverity) {
        let _ = self
            .events
            .send(FlotillaEventEnvelope::new(event, source, severity));
    }
}
