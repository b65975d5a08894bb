//! Shared fixtures for the integration tests.

#![allow(dead_code)]

pub mod keep_alive;
pub mod mock_dingtalk;

use dingbridge::core::{Alert, KeyValues, WebhookMessage};

pub fn labels(pairs: &[(&str, &str)]) -> KeyValues {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// A firing group with a single alert, shaped like what Alertmanager posts.
pub fn firing_message() -> WebhookMessage {
    WebhookMessage {
        version: "4".to_string(),
        group_key: "{}:{alertname=\"InstanceDown\"}".to_string(),
        status: "firing".to_string(),
        receiver: "dingtalk".to_string(),
        group_labels: labels(&[("alertname", "InstanceDown")]),
        common_labels: labels(&[("alertname", "InstanceDown"), ("job", "node")]),
        common_annotations: labels(&[("summary", "node-3 is unreachable")]),
        external_url: "http://alertmanager:9093".to_string(),
        alerts: vec![Alert {
            status: "firing".to_string(),
            labels: labels(&[("alertname", "InstanceDown"), ("instance", "node-3:9100")]),
            annotations: labels(&[("summary", "node-3 is unreachable")]),
            generator_url: "http://prometheus:9090/graph?g0.expr=up".to_string(),
            fingerprint: "4f1e2d3c".to_string(),
            ..Default::default()
        }],
        ..Default::default()
    }
}

pub const FIRING_MESSAGE_JSON: &str = r#"{
    "version": "4",
    "groupKey": "{}:{alertname=\"InstanceDown\"}",
    "status": "firing",
    "receiver": "dingtalk",
    "groupLabels": {"alertname": "InstanceDown"},
    "commonLabels": {"alertname": "InstanceDown", "job": "node"},
    "commonAnnotations": {"summary": "node-3 is unreachable"},
    "externalURL": "http://alertmanager:9093",
    "alerts": [{
        "status": "firing",
        "labels": {"alertname": "InstanceDown", "instance": "node-3:9100"},
        "annotations": {"summary": "node-3 is unreachable"},
        "startsAt": "2025-07-08T19:03:52Z",
        "endsAt": "0001-01-01T00:00:00Z",
        "generatorURL": "http://prometheus:9090/graph?g0.expr=up",
        "fingerprint": "4f1e2d3c"
    }]
}"#;
