//! Broadcast channel for domain events.
//!
//! [`EventBus`] wraps a [`tokio::sync::broadcast`] channel. The notification
//! router publishes every [`ZWaveEvent`] through the bus and any number of
//! application-side consumers subscribe to it.

use tokio::sync::broadcast;

use super::ZWaveEvent;

/// Broadcast bus for [`ZWaveEvent`]s.
///
/// Backed by a `tokio::broadcast` channel with a configurable capacity
/// (default 10 000). When the ring buffer is full, the oldest events are
/// dropped for lagging receivers. `send` never blocks, so publishing from
/// the transport callback thread is safe.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ZWaveEvent>,
}

impl EventBus {
    /// Creates a new `EventBus` with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of receivers that received the event.
    /// If there are no active receivers, the event is silently dropped.
    pub fn publish(&self, event: ZWaveEvent) -> usize {
        tracing::trace!(
            network_id = %event.network_id(),
            event = event.event_type_str(),
            "publishing domain event"
        );
        self.sender.send(event).unwrap_or(0)
    }

    /// Creates a new receiver that will receive all future events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ZWaveEvent> {
        self.sender.subscribe()
    }

    /// Returns the current number of active receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
