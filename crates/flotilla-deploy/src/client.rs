//! Deployment API client

use crate::error::{DeployError, Result};
use crate::event::{EventData, TriggerEvent};
use std::collections::BTreeMap;
use std::time::Duration;

/// Default per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the deployment API's control plane and event endpoints.
///
/// Authentication is a bearer token in the `x-token` header.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    /// Create a client for `base_url` (no trailing slash) with the given
    /// API token and per-request timeout.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Ok(Self {
            http,
            base_url,
            token: token.into(),
        })
    }

    /// Register a service with the deployment API.
    ///
    /// Returns the HTTP status the API answered with; the caller records it
    /// on the service record. A non-2xx answer is still a completed call —
    /// the status is the API's verdict, not a transport failure.
    pub async fn create_service(&self, project: &str, service: &str) -> Result<u16> {
        let url = format!("{}/controlPlane/v1/project/{project}/service", self.base_url);
        let body = BTreeMap::from([("serviceName", service)]);

        tracing::info!(project, service, "creating service");
        let response = self
            .http
            .post(url)
            .header("content-type", "application/json")
            .header("x-token", &self.token)
            .json(&body)
            .send()
            .await?;
        Ok(response.status().as_u16())
    }

    /// Delete a service from the deployment API
    pub async fn delete_service(&self, project: &str, service: &str) -> Result<()> {
        let url = format!(
            "{}/controlPlane/v1/project/{project}/service/{service}",
            self.base_url
        );

        tracing::info!(project, service, "deleting service");
        let response = self
            .http
            .delete(url)
            .header("content-type", "application/json")
            .header("x-token", &self.token)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DeployError::Status {
                action: format!("delete service {project}/{service}"),
                status: status.as_u16(),
            });
        }
        Ok(())
    }

    /// Whether a service is already known to the deployment API, probed via
    /// its resource endpoint. Only a 200 answer counts as existing.
    pub async fn service_exists(&self, project: &str, stage: &str, service: &str) -> Result<bool> {
        let url = format!(
            "{}/controlPlane/v1/project/{project}/stage/{stage}/service/{service}/resource",
            self.base_url
        );
        let response = self
            .http
            .get(url)
            .header("x-token", &self.token)
            .send()
            .await?;
        Ok(response.status().as_u16() == 200)
    }

    /// Post a deployment trigger event for a service.
    pub async fn trigger_deployment(
        &self,
        project: &str,
        service: &str,
        stage: &str,
        trigger: &str,
        image: &str,
        labels: BTreeMap<String, String>,
    ) -> Result<()> {
        let event = TriggerEvent::new(
            trigger,
            EventData {
                project: project.to_string(),
                service: service.to_string(),
                stage: stage.to_string(),
                image: image.to_string(),
                labels,
            },
        );
        let url = format!("{}/v1/event", self.base_url);

        tracing::info!(project, service, stage, trigger, "triggering deployment");
        let response = self
            .http
            .post(url)
            .header("content-type", "application/cloudevents+json")
            .header("x-token", &self.token)
            .json(&event)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DeployError::Status {
                action: format!("trigger deployment {project}/{service}"),
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}
