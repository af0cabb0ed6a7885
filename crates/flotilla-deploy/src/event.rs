//! CloudEvents-shaped trigger event payloads

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Source attribute stamped on every trigger event
pub const EVENT_SOURCE: &str = "Flotilla GitOps Operator";

/// Envelope posted to `/v1/event` to trigger a deployment sequence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerEvent {
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub contenttype: String,

    #[serde(default)]
    pub data: EventData,

    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub source: String,

    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub specversion: String,

    #[serde(rename = "type", skip_serializing_if = "String::is_empty", default)]
    pub event_type: String,
}

impl TriggerEvent {
    /// Standard envelope around `data`, typed with the service's trigger
    /// command
    pub fn new(event_type: impl Into<String>, data: EventData) -> Self {
        Self {
            contenttype: "application/json".into(),
            data,
            source: EVENT_SOURCE.into(),
            specversion: "1.0".into(),
            event_type: event_type.into(),
        }
    }
}

/// Deployment-describing payload of a trigger event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventData {
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub project: String,

    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub service: String,

    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub stage: String,

    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub image: String,

    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub labels: BTreeMap<String, String>,
}

/// Label set attached to a trigger event.
///
/// Every label is gated on its source value being non-empty; a version also
/// yields a `buildId` label.
pub fn deployment_labels(
    version: &str,
    author: &str,
    source_git_hash: &str,
) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    if !version.is_empty() {
        labels.insert("version".to_string(), version.to_string());
        labels.insert("buildId".to_string(), version.to_string());
    }
    if !author.is_empty() {
        labels.insert("author".to_string(), author.to_string());
    }
    if !source_git_hash.is_empty() {
        labels.insert("sourceGitHash".to_string(), source_git_hash.to_string());
    }
    labels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_gated_on_non_empty_values() {
        let labels = deployment_labels("1.2.3", "dev@example.com", "cafe");
        assert_eq!(labels.get("version").map(String::as_str), Some("1.2.3"));
        assert_eq!(labels.get("buildId").map(String::as_str), Some("1.2.3"));
        assert_eq!(labels.get("author").map(String::as_str), Some("dev@example.com"));
        assert_eq!(labels.get("sourceGitHash").map(String::as_str), Some("cafe"));
    }

    #[test]
    fn test_empty_version_omits_version_and_build_id() {
        let labels = deployment_labels("", "dev@example.com", "");
        assert!(labels.get("version").is_none());
        assert!(labels.get("buildId").is_none());
        assert_eq!(labels.len(), 1);
    }

    #[test]
    fn test_all_empty_yields_no_labels() {
        assert!(deployment_labels("", "", "").is_empty());
    }

    #[test]
    fn test_event_envelope_serialization() {
        let data = EventData {
            project: "sockshop".into(),
            service: "carts".into(),
            stage: "dev".into(),
            image: "carts:1.2.3".into(),
            labels: deployment_labels("1.2.3", "", ""),
        };
        let event = TriggerEvent::new("sh.keptn.event.dev.delivery.triggered", data);
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["specversion"], "1.0");
        assert_eq!(json["type"], "sh.keptn.event.dev.delivery.triggered");
        assert_eq!(json["data"]["image"], "carts:1.2.3");
        assert_eq!(json["data"]["labels"]["buildId"], "1.2.3");
        // Empty fields are omitted, matching the wire format.
        assert!(json["data"].get("configurationChange").is_none());
    }
}
