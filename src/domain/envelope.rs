//! Serialized form of domain events for out-of-process consumers.
//!
//! [`EventEnvelope`] wraps a [`ZWaveEvent`] with a unique id and its type
//! discriminator; [`NetworkFilter`] selects which networks a consumer
//! receives events for.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{NetworkId, ZWaveEvent};
use crate::error::GatewayError;

/// Top-level event envelope.
#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope {
    /// Server-generated unique id.
    pub id: String,
    /// Event type discriminator, e.g. `"value_changed"`.
    #[serde(rename = "type")]
    pub event_type: &'static str,
    /// Network the event belongs to.
    pub network_id: NetworkId,
    /// ISO-8601 timestamp of the event.
    pub timestamp: DateTime<Utc>,
    /// The event itself.
    pub payload: serde_json::Value,
}

impl EventEnvelope {
    /// Wraps an event.
    #[must_use]
    pub fn new(event: &ZWaveEvent) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event_type: event.event_type_str(),
            network_id: event.network_id(),
            timestamp: event.timestamp(),
            payload: serde_json::to_value(event).unwrap_or_default(),
        }
    }

    /// Wraps a failed command outcome for `network_id`.
    #[must_use]
    pub fn error(network_id: NetworkId, error: &GatewayError) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event_type: "error",
            network_id,
            timestamp: Utc::now(),
            payload: serde_json::json!({
                "code": error.error_code(),
                "message": error.to_string(),
            }),
        }
    }

    /// Serializes the envelope to a JSON string.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl From<&ZWaveEvent> for EventEnvelope {
    fn from(event: &ZWaveEvent) -> Self {
        Self::new(event)
    }
}

/// Per-consumer set of networks to forward events for.
#[derive(Debug, Default)]
pub struct NetworkFilter {
    /// Subscribed networks. Ignored while `all` is set.
    networks: HashSet<NetworkId>,
    all: bool,
}

impl NetworkFilter {
    /// Creates an empty filter that matches nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a filter that matches every network.
    #[must_use]
    pub fn all() -> Self {
        Self {
            networks: HashSet::new(),
            all: true,
        }
    }

    /// Adds networks to the filter.
    pub fn subscribe(&mut self, ids: &[NetworkId]) {
        self.networks.extend(ids.iter().copied());
    }

    /// Removes networks from the filter.
    pub fn unsubscribe(&mut self, ids: &[NetworkId]) {
        for id in ids {
            self.networks.remove(id);
        }
    }

    /// Returns `true` if events of `event` should be forwarded.
    #[must_use]
    pub fn matches(&self, event: &ZWaveEvent) -> bool {
        self.all || self.networks.contains(&event.network_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sleep_event(network_id: NetworkId) -> ZWaveEvent {
        ZWaveEvent::NodeSleep {
            network_id,
            node_id: 12,
            sleeping: true,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn envelope_carries_type_and_payload() {
        let id = NetworkId::new();
        let event = sleep_event(id);
        let envelope = EventEnvelope::from(&event);

        assert_eq!(envelope.event_type, "node_sleep");
        assert_eq!(envelope.network_id, id);
        assert_eq!(envelope.timestamp, event.timestamp());
        assert_eq!(envelope.payload.get("sleeping"), Some(&serde_json::json!(true)));

        let json = envelope.to_json();
        assert!(json.contains("\"type\":\"node_sleep\""));
    }

    #[test]
    fn error_envelope_has_code() {
        let id = NetworkId::new();
        let envelope = EventEnvelope::error(id, &GatewayError::CommandInUse(id));
        assert_eq!(envelope.event_type, "error");
        assert_eq!(envelope.payload.get("code"), Some(&serde_json::json!(2002)));
    }

    #[test]
    fn filter_matches_subscribed_networks() {
        let wanted = NetworkId::new();
        let other = NetworkId::new();
        let mut filter = NetworkFilter::new();
        assert!(!filter.matches(&sleep_event(wanted)));

        filter.subscribe(&[wanted]);
        assert!(filter.matches(&sleep_event(wanted)));
        assert!(!filter.matches(&sleep_event(other)));

        filter.unsubscribe(&[wanted]);
        assert!(!filter.matches(&sleep_event(wanted)));
        assert!(NetworkFilter::all().matches(&sleep_event(other)));
    }
}
