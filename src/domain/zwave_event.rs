//! Domain events emitted towards the consuming application.
//!
//! Every classified notification from the transport ends up as zero or more
//! [`ZWaveEvent`]s published on the [`super::EventBus`]. Events are ordered
//! per network but not globally.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{DomainValue, NetworkId, NodeRef};

/// Domain event emitted after every classified notification.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum ZWaveEvent {
    /// The driver for a network came up and a home id was bound.
    NetworkStarted {
        /// Network identifier.
        network_id: NetworkId,
        /// Transport-assigned home id.
        home_id: u32,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Network setup failed or timed out.
    NetworkFailed {
        /// Network identifier.
        network_id: NetworkId,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A node is present (new join or re-announcement after reboot).
    NodeAdded {
        /// Network identifier.
        network_id: NetworkId,
        /// Node id.
        node_id: u8,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A node left the network.
    NodeRemoved {
        /// Network identifier.
        network_id: NetworkId,
        /// Node id.
        node_id: u8,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Node naming or protocol info changed; re-query node attributes.
    NodeDataChanged {
        /// Network identifier.
        network_id: NetworkId,
        /// Node id.
        node_id: u8,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },

    /// All queries for a node have completed.
    NodeInitialized {
        /// Network identifier.
        network_id: NetworkId,
        /// Node id.
        node_id: u8,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A value was discovered on a node.
    ValueAdded {
        /// Network identifier.
        network_id: NetworkId,
        /// Node id.
        node_id: u8,
        /// Decoded value snapshot.
        value: DomainValue,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A value changed or was refreshed.
    ValueChanged {
        /// Network identifier.
        network_id: NetworkId,
        /// Node id.
        node_id: u8,
        /// Decoded value snapshot.
        value: DomainValue,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A value disappeared from a node.
    ValueRemoved {
        /// Network identifier.
        network_id: NetworkId,
        /// Node id.
        node_id: u8,
        /// Engine-assigned value id.
        value_id: u64,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Node reachability changed.
    NodeReachable {
        /// Network identifier.
        network_id: NetworkId,
        /// Node id.
        node_id: u8,
        /// Whether the node is reachable.
        reachable: bool,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Node failed status changed.
    NodeFailed {
        /// Network identifier.
        network_id: NetworkId,
        /// Node id.
        node_id: u8,
        /// Whether the node is presumed dead.
        failed: bool,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Node sleep status changed.
    NodeSleep {
        /// Network identifier.
        network_id: NetworkId,
        /// Node id.
        node_id: u8,
        /// Whether the node is asleep.
        sleeping: bool,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Normalized link quality for a node.
    NodeLinkQuality {
        /// Network identifier.
        network_id: NetworkId,
        /// Node id.
        node_id: u8,
        /// Link quality in `0..=100`.
        quality: u8,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Level signal: the controller waits for a node to be included.
    WaitingForNodeAddition {
        /// Network identifier.
        network_id: NetworkId,
        /// Whether the controller is waiting.
        waiting: bool,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Level signal: the controller waits for a node to be excluded.
    WaitingForNodeRemoval {
        /// Network identifier.
        network_id: NetworkId,
        /// Whether the controller is waiting.
        waiting: bool,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl ZWaveEvent {
    /// Returns the network ID associated with this event.
    #[must_use]
    pub fn network_id(&self) -> NetworkId {
        match self {
            Self::NetworkStarted { network_id, .. }
            | Self::NetworkFailed { network_id, .. }
            | Self::NodeAdded { network_id, .. }
            | Self::NodeRemoved { network_id, .. }
            | Self::NodeDataChanged { network_id, .. }
            | Self::NodeInitialized { network_id, .. }
            | Self::ValueAdded { network_id, .. }
            | Self::ValueChanged { network_id, .. }
            | Self::ValueRemoved { network_id, .. }
            | Self::NodeReachable { network_id, .. }
            | Self::NodeFailed { network_id, .. }
            | Self::NodeSleep { network_id, .. }
            | Self::NodeLinkQuality { network_id, .. }
            | Self::WaitingForNodeAddition { network_id, .. }
            | Self::WaitingForNodeRemoval { network_id, .. } => *network_id,
        }
    }

    /// Returns the node this event concerns, if any.
    #[must_use]
    pub fn node(&self) -> Option<NodeRef> {
        match self {
            Self::NodeAdded { network_id, node_id, .. }
            | Self::NodeRemoved { network_id, node_id, .. }
            | Self::NodeDataChanged { network_id, node_id, .. }
            | Self::NodeInitialized { network_id, node_id, .. }
            | Self::ValueAdded { network_id, node_id, .. }
            | Self::ValueChanged { network_id, node_id, .. }
            | Self::ValueRemoved { network_id, node_id, .. }
            | Self::NodeReachable { network_id, node_id, .. }
            | Self::NodeFailed { network_id, node_id, .. }
            | Self::NodeSleep { network_id, node_id, .. }
            | Self::NodeLinkQuality { network_id, node_id, .. } => Some(NodeRef {
                network_id: *network_id,
                node_id: *node_id,
            }),
            Self::NetworkStarted { .. }
            | Self::NetworkFailed { .. }
            | Self::WaitingForNodeAddition { .. }
            | Self::WaitingForNodeRemoval { .. } => None,
        }
    }

    /// Returns when the event was produced.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::NetworkStarted { timestamp, .. }
            | Self::NetworkFailed { timestamp, .. }
            | Self::NodeAdded { timestamp, .. }
            | Self::NodeRemoved { timestamp, .. }
            | Self::NodeDataChanged { timestamp, .. }
            | Self::NodeInitialized { timestamp, .. }
            | Self::ValueAdded { timestamp, .. }
            | Self::ValueChanged { timestamp, .. }
            | Self::ValueRemoved { timestamp, .. }
            | Self::NodeReachable { timestamp, .. }
            | Self::NodeFailed { timestamp, .. }
            | Self::NodeSleep { timestamp, .. }
            | Self::NodeLinkQuality { timestamp, .. }
            | Self::WaitingForNodeAddition { timestamp, .. }
            | Self::WaitingForNodeRemoval { timestamp, .. } => *timestamp,
        }
    }

    /// Returns the event type as a static string slice.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::NetworkStarted { .. } => "network_started",
            Self::NetworkFailed { .. } => "network_failed",
            Self::NodeAdded { .. } => "node_added",
            Self::NodeRemoved { .. } => "node_removed",
            Self::NodeDataChanged { .. } => "node_data_changed",
            Self::NodeInitialized { .. } => "node_initialized",
            Self::ValueAdded { .. } => "value_added",
            Self::ValueChanged { .. } => "value_changed",
            Self::ValueRemoved { .. } => "value_removed",
            Self::NodeReachable { .. } => "node_reachable",
            Self::NodeFailed { .. } => "node_failed",
            Self::NodeSleep { .. } => "node_sleep",
            Self::NodeLinkQuality { .. } => "node_link_quality",
            Self::WaitingForNodeAddition { .. } => "waiting_for_node_addition",
            Self::WaitingForNodeRemoval { .. } => "waiting_for_node_removal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reachable_event_type_and_node() {
        let id = NetworkId::new();
        let event = ZWaveEvent::NodeReachable {
            network_id: id,
            node_id: 4,
            reachable: false,
            timestamp: Utc::now(),
        };
        assert_eq!(event.event_type_str(), "node_reachable");
        assert_eq!(
            event.node(),
            Some(NodeRef {
                network_id: id,
                node_id: 4
            })
        );
    }

    #[test]
    fn waiting_signal_has_no_node() {
        let event = ZWaveEvent::WaitingForNodeAddition {
            network_id: NetworkId::new(),
            waiting: true,
            timestamp: Utc::now(),
        };
        assert!(event.node().is_none());
    }

    #[test]
    fn serializes_with_tag() {
        let event = ZWaveEvent::NodeLinkQuality {
            network_id: NetworkId::new(),
            node_id: 9,
            quality: 72,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap_or_default();
        assert!(json.contains("\"event_type\":\"node_link_quality\""));
        assert!(json.contains("\"quality\":72"));
    }
}
