//! Project coordinator: desired-state snapshot to per-service work

use crate::context::PassContext;
use crate::error::Result;
use flotilla_store::{ProjectStateStore, RecordStore, Versioned};
use flotilla_types::{
    DesiredStateSnapshot, EventSeverity, EventSource, FlotillaEvent, ProjectState, RecordKey,
    ServiceDeclaration, ServiceRecord,
};

/// Reconciles one project's records against a desired-state snapshot.
///
/// A pass is re-entrant: record creation is get-or-create, deletion marking
/// is flag-gated, and redeployment is gated on the source revision having
/// advanced past the last fully absorbed one. The observed revision is
/// persisted only after every per-service update succeeded, so a partial
/// pass is retried from scratch and the work is at-least-once.
#[derive(Debug, Default)]
pub struct ProjectCoordinator;

impl ProjectCoordinator {
    pub fn new() -> Self {
        Self
    }

    /// One reconciliation pass for `ctx.project` against `snapshot`.
    pub async fn reconcile(&self, ctx: &PassContext, snapshot: &DesiredStateSnapshot) -> Result<()> {
        tracing::info!(project = %ctx.project, tip = %snapshot.tip, "reconciling project");

        for declaration in &snapshot.services {
            self.ensure_record(ctx, snapshot, declaration).await?;
        }

        self.mark_removed_services(ctx, snapshot).await?;

        let prior = ctx.store.get_project_state(&ctx.project).await?;
        let state = prior
            .as_ref()
            .map(|p| p.value.clone())
            .unwrap_or_else(|| ProjectState::new(ctx.project.clone()));

        if state.revision_advanced(&snapshot.tip) {
            for declaration in &snapshot.services {
                self.request_redeploy(ctx, snapshot, declaration).await?;
            }

            // Absorb the revision only now, after every per-service update
            // succeeded; failing earlier leaves the prior state untouched
            // and the whole pass is retried.
            let mut advanced = state.clone();
            advanced.last_observed_source_commit = Some(snapshot.tip.clone());
            advanced.updated_at = chrono::Utc::now();
            ctx.store
                .put_project_state(advanced, prior.as_ref().map(|p| p.version))
                .await?;

            ctx.emit(
                FlotillaEvent::SourceAdvanced {
                    project: ctx.project.clone(),
                    from: state.last_observed_source_commit.clone(),
                    to: snapshot.tip.clone(),
                },
                EventSource::Coordinator,
                EventSeverity::Info,
            );
        }

        tracing::info!(project = %ctx.project, "finished reconciling project");
        Ok(())
    }

    /// Get-or-create the record for a declared service. An existing record
    /// is left untouched, whoever created it.
    async fn ensure_record(
        &self,
        ctx: &PassContext,
        snapshot: &DesiredStateSnapshot,
        declaration: &ServiceDeclaration,
    ) -> Result<()> {
        let key = RecordKey::new(ctx.project.clone(), declaration.name.clone());
        if ctx.store.get_record(&key).await?.is_some() {
            return Ok(());
        }

        let mut record = ServiceRecord::new(ctx.project.clone(), declaration.name.clone());
        record.start_stage = snapshot.start_stage(declaration).unwrap_or_default();
        record.trigger_command = declaration.deployment_trigger.clone();
        ctx.store.create_record(record).await?;

        tracing::info!(key = %key, "created service record");
        ctx.emit(
            FlotillaEvent::RecordCreated { key },
            EventSource::Coordinator,
            EventSeverity::Info,
        );
        Ok(())
    }

    /// Mark records whose service left the snapshot, and physically remove
    /// tombstones the agent already confirmed deleted.
    async fn mark_removed_services(
        &self,
        ctx: &PassContext,
        snapshot: &DesiredStateSnapshot,
    ) -> Result<()> {
        for stored in ctx.store.list_records(&ctx.project).await? {
            if snapshot.contains(&stored.value.service) {
                continue;
            }
            let key = stored.value.key();

            if stored.value.safe_to_delete {
                ctx.store.remove_record(&key, stored.version).await?;
                tracing::info!(key = %key, "removed tombstone record");
                ctx.emit(
                    FlotillaEvent::RecordRemoved { key },
                    EventSource::Coordinator,
                    EventSeverity::Info,
                );
            } else if !stored.value.deletion_pending {
                let mut record = stored.value.clone();
                record.deletion_pending = true;
                record.touch();
                ctx.store
                    .update_record(Versioned::new(stored.version, record))
                    .await?;

                tracing::info!(key = %key, "marked service for deletion");
                ctx.emit(
                    FlotillaEvent::MarkedForDeletion { key },
                    EventSource::Coordinator,
                    EventSeverity::Info,
                );
            }
        }
        Ok(())
    }

    /// Re-resolve a service's desired version from its own published
    /// deployment metadata and request a redeployment when it changed.
    async fn request_redeploy(
        &self,
        ctx: &PassContext,
        snapshot: &DesiredStateSnapshot,
        declaration: &ServiceDeclaration,
    ) -> Result<()> {
        let key = RecordKey::new(ctx.project.clone(), declaration.name.clone());
        let Some(stored) = ctx.store.get_record(&key).await? else {
            return Ok(());
        };

        let metadata = snapshot.deployment_metadata(&declaration.name);
        if metadata.image_version == stored.value.desired_version {
            return Ok(());
        }

        let mut record = stored.value.clone();
        record.desired_version = metadata.image_version.clone();
        record.last_author = metadata.author;
        record.last_source_commit_hash = metadata.git_commit;
        if let Some(stage) = snapshot.start_stage(declaration) {
            record.start_stage = stage;
        }
        record.trigger_command = declaration.deployment_trigger.clone();
        record.deployment_pending = true;
        record.touch();
        ctx.store
            .update_record(Versioned::new(stored.version, record))
            .await?;

        tracing::info!(key = %key, version = %metadata.image_version, "requested redeployment");
        ctx.emit(
            FlotillaEvent::RedeployRequested {
                key,
                version: metadata.image_version,
            },
            EventSource::Coordinator,
            EventSeverity::Info,
        );
        Ok(())
    }
}
