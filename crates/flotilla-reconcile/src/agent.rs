//! Service agent: drains one record's pending flags against the deployment API

use crate::context::PassContext;
use crate::error::Result;
use flotilla_deploy::{deployment_labels, ApiClient};
use flotilla_store::{RecordStore, Versioned};
use flotilla_types::{EventSeverity, EventSource, FlotillaEvent, RecordKey};
use std::sync::Arc;

/// Owns the remote lifecycle of one service record per pass.
///
/// Flags are processed in fixed priority: creation, then deployment, then
/// deletion. Each flag is cleared strictly after its remote call succeeded;
/// a failed call leaves the flag set and the pass ends, so the action is
/// retried on the next trigger (at-least-once against the deployment API).
pub struct ServiceAgent {
    api: Arc<ApiClient>,
}

impl ServiceAgent {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// One pass over the record at `key`. A missing record is a no-op: the
    /// coordinator removed it between trigger and pass.
    pub async fn reconcile(&self, ctx: &PassContext, key: &RecordKey) -> Result<()> {
        let Some(mut stored) = ctx.store.get_record(key).await? else {
            tracing::debug!(key = %key, "record gone before agent pass");
            return Ok(());
        };
        tracing::info!(key = %key, phase = ?stored.value.phase(), "reconciling service");

        if stored.value.creation_pending {
            let exists = self
                .api
                .service_exists(&key.project, &stored.value.start_stage, &key.service)
                .await?;

            let mut record = stored.value.clone();
            if exists {
                tracing::info!(key = %key, "service already registered");
            } else {
                let status = self.api.create_service(&key.project, &key.service).await?;
                record.last_setup_status = Some(status);
                ctx.emit(
                    FlotillaEvent::ServiceRegistered {
                        key: key.clone(),
                        status,
                    },
                    EventSource::Agent,
                    EventSeverity::Info,
                );
            }
            record.creation_pending = false;
            record.touch();
            stored = ctx
                .store
                .update_record(Versioned::new(stored.version, record))
                .await?;
        }

        if stored.value.deployment_pending {
            let record = &stored.value;
            let image = format!("{}:{}", key.service, record.desired_version);
            let labels = deployment_labels(
                &record.desired_version,
                &record.last_author,
                &record.last_source_commit_hash,
            );
            self.api
                .trigger_deployment(
                    &key.project,
                    &key.service,
                    &record.start_stage,
                    &record.trigger_command,
                    &image,
                    labels,
                )
                .await?;

            let mut record = stored.value.clone();
            record.deployment_pending = false;
            record.touch();
            let version = record.desired_version.clone();
            let stage = record.start_stage.clone();
            ctx.store
                .update_record(Versioned::new(stored.version, record))
                .await?;

            ctx.emit(
                FlotillaEvent::DeploymentTriggered {
                    key: key.clone(),
                    version,
                    stage,
                },
                EventSource::Agent,
                EventSeverity::Info,
            );
            // Deletion, if also flagged, waits for the next pass.
            return Ok(());
        }

        if stored.value.deletion_pending && !stored.value.safe_to_delete {
            self.api.delete_service(&key.project, &key.service).await?;

            let mut record = stored.value.clone();
            record.safe_to_delete = true;
            record.touch();
            ctx.store
                .update_record(Versioned::new(stored.version, record))
                .await?;

            ctx.emit(
                FlotillaEvent::ServiceDeleted { key: key.clone() },
                EventSource::Agent,
                EventSeverity::Info,
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flotilla_deploy::DEFAULT_REQUEST_TIMEOUT;
    use flotilla_store::{InMemoryStore, RecordStore, Store};
    use flotilla_types::{LifecyclePhase, ServiceRecord};

    fn api(server: &mockito::ServerGuard) -> Arc<ApiClient> {
        Arc::new(ApiClient::new(server.url(), "token", DEFAULT_REQUEST_TIMEOUT).unwrap())
    }

    fn context(store: &Arc<InMemoryStore>) -> PassContext {
        PassContext::detached("sockshop", store.clone() as Arc<dyn Store>)
    }

    async fn seed(store: &InMemoryStore, configure: impl FnOnce(&mut ServiceRecord)) -> RecordKey {
        let mut record = ServiceRecord::new("sockshop", "carts");
        record.start_stage = "dev".into();
        record.trigger_command = "sh.keptn.event.dev.delivery.triggered".into();
        configure(&mut record);
        let key = record.key();
        store.create_record(record).await.unwrap();
        key
    }

    #[tokio::test]
    async fn test_creation_registers_missing_service() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/controlPlane/v1/project/sockshop/stage/dev/service/carts/resource")
            .with_status(404)
            .create_async()
            .await;
        let create = server
            .mock("POST", "/controlPlane/v1/project/sockshop/service")
            .with_status(200)
            .create_async()
            .await;

        let store = Arc::new(InMemoryStore::new());
        let ctx = context(&store);
        let key = seed(&store, |_| {}).await;

        ServiceAgent::new(api(&server)).reconcile(&ctx, &key).await.unwrap();

        create.assert_async().await;
        let stored = store.get_record(&key).await.unwrap().unwrap();
        assert!(!stored.value.creation_pending);
        assert_eq!(stored.value.last_setup_status, Some(200));
        assert_eq!(stored.value.phase(), LifecyclePhase::Stable);
    }

    #[tokio::test]
    async fn test_creation_treats_existing_service_as_success() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/controlPlane/v1/project/sockshop/stage/dev/service/carts/resource")
            .with_status(200)
            .create_async()
            .await;
        // No create endpoint mocked: a POST would fail the test via 501.

        let store = Arc::new(InMemoryStore::new());
        let ctx = context(&store);
        let key = seed(&store, |_| {}).await;

        ServiceAgent::new(api(&server)).reconcile(&ctx, &key).await.unwrap();

        let stored = store.get_record(&key).await.unwrap().unwrap();
        assert!(!stored.value.creation_pending);
        assert_eq!(stored.value.last_setup_status, None);
    }

    #[tokio::test]
    async fn test_deployment_triggers_and_clears_flag() {
        let mut server = mockito::Server::new_async().await;
        let trigger = server
            .mock("POST", "/v1/event")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "type": "sh.keptn.event.dev.delivery.triggered",
                "data": {
                    "project": "sockshop",
                    "service": "carts",
                    "stage": "dev",
                    "image": "carts:1.0",
                    "labels": { "version": "1.0", "buildId": "1.0" }
                }
            })))
            .with_status(200)
            .create_async()
            .await;

        let store = Arc::new(InMemoryStore::new());
        let ctx = context(&store);
        let key = seed(&store, |record| {
            record.creation_pending = false;
            record.deployment_pending = true;
            record.desired_version = "1.0".into();
        })
        .await;

        ServiceAgent::new(api(&server)).reconcile(&ctx, &key).await.unwrap();

        trigger.assert_async().await;
        let stored = store.get_record(&key).await.unwrap().unwrap();
        assert!(!stored.value.deployment_pending);
    }

    #[tokio::test]
    async fn test_failed_trigger_leaves_flag_set() {
        let mut server = mockito::Server::new_async().await;
        server.mock("POST", "/v1/event").with_status(500).create_async().await;

        let store = Arc::new(InMemoryStore::new());
        let ctx = context(&store);
        let key = seed(&store, |record| {
            record.creation_pending = false;
            record.deployment_pending = true;
            record.desired_version = "1.0".into();
        })
        .await;

        let err = ServiceAgent::new(api(&server)).reconcile(&ctx, &key).await.unwrap_err();
        assert!(!err.is_conflict());

        // The flag survives as the durable memory of unfinished work.
        let stored = store.get_record(&key).await.unwrap().unwrap();
        assert!(stored.value.deployment_pending);
    }

    #[tokio::test]
    async fn test_deletion_confirms_then_marks_safe_to_delete() {
        let mut server = mockito::Server::new_async().await;
        let delete = server
            .mock("DELETE", "/controlPlane/v1/project/sockshop/service/carts")
            .with_status(200)
            .create_async()
            .await;

        let store = Arc::new(InMemoryStore::new());
        let ctx = context(&store);
        let key = seed(&store, |record| {
            record.creation_pending = false;
            record.deletion_pending = true;
        })
        .await;

        ServiceAgent::new(api(&server)).reconcile(&ctx, &key).await.unwrap();

        delete.assert_async().await;
        let stored = store.get_record(&key).await.unwrap().unwrap();
        assert!(stored.value.safe_to_delete);
        assert_eq!(stored.value.phase(), LifecyclePhase::SafeToDelete);
        // Physical removal is the coordinator's job, not the agent's.
        assert!(store.get_record(&key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_deployment_defers_deletion_to_next_pass() {
        let mut server = mockito::Server::new_async().await;
        server.mock("POST", "/v1/event").with_status(200).create_async().await;
        let delete = server
            .mock("DELETE", "/controlPlane/v1/project/sockshop/service/carts")
            .with_status(200)
            .create_async()
            .await;

        let store = Arc::new(InMemoryStore::new());
        let ctx = context(&store);
        let key = seed(&store, |record| {
            record.creation_pending = false;
            record.deployment_pending = true;
            record.deletion_pending = true;
            record.desired_version = "1.0".into();
        })
        .await;

        let agent = ServiceAgent::new(api(&server));
        agent.reconcile(&ctx, &key).await.unwrap();

        // First pass drained only the deployment.
        let stored = store.get_record(&key).await.unwrap().unwrap();
        assert!(!stored.value.deployment_pending);
        assert!(stored.value.deletion_pending);
        assert!(!stored.value.safe_to_delete);

        agent.reconcile(&ctx, &key).await.unwrap();
        delete.assert_async().await;
        let stored = store.get_record(&key).await.unwrap().unwrap();
        assert!(stored.value.safe_to_delete);
    }

    #[tokio::test]
    async fn test_missing_record_is_a_noop() {
        let server = mockito::Server::new_async().await;
        let store = Arc::new(InMemoryStore::new());
        let ctx = context(&store);

        ServiceAgent::new(api(&server))
            .reconcile(&ctx, &RecordKey::new("sockshop", "ghost"))
            .await
            .unwrap();
    }
}
