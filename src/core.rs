//! Core domain types for dingbridge
//!
//! This module defines the event payload that flows into the notification
//! pipeline: the webhook message Alertmanager posts to its receivers, and
//! the individual alerts it carries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A set of label or annotation key/value pairs, kept sorted by key.
pub type KeyValues = BTreeMap<String, String>;

/// The body of an Alertmanager webhook notification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct WebhookMessage {
    /// Webhook payload format version (currently "4").
    pub version: String,
    /// Key identifying the alert group.
    pub group_key: String,
    /// How many alerts Alertmanager dropped to respect `max_alerts`.
    pub truncated_alerts: u64,
    /// Status of the group as a whole: "firing" or "resolved".
    pub status: String,
    /// Name of the receiver that matched the group.
    pub receiver: String,
    /// Labels used to group the alerts.
    pub group_labels: KeyValues,
    /// Labels shared by every alert in the group.
    pub common_labels: KeyValues,
    /// Annotations shared by every alert in the group.
    pub common_annotations: KeyValues,
    /// Backlink to the Alertmanager instance.
    #[serde(rename = "externalURL")]
    pub external_url: String,
    /// The alerts in this group.
    pub alerts: Vec<Alert>,
}

impl WebhookMessage {
    /// Returns the alerts that are still firing.
    pub fn firing(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.iter().filter(|alert| alert.is_firing())
    }

    /// Returns the alerts that have resolved.
    pub fn resolved(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.iter().filter(|alert| !alert.is_firing())
    }
}

/// A single alert inside a [`WebhookMessage`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Alert {
    /// "firing" or "resolved".
    pub status: String,
    pub labels: KeyValues,
    pub annotations: KeyValues,
    pub starts_at: DateTime<Utc>,
    /// Zero time (`0001-01-01T00:00:00Z`) while the alert is still firing.
    pub ends_at: DateTime<Utc>,
    /// Link to the source that generated the alert.
    #[serde(rename = "generatorURL")]
    pub generator_url: String,
    pub fingerprint: String,
}

impl Alert {
    pub fn is_firing(&self) -> bool {
        self.status == "firing"
    }
}
