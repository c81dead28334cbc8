//! Classification of raw transport notifications into domain events.
//!
//! [`NotificationRouter`] borrows the locked gateway state for the duration
//! of one notification. Handling follows a fixed precedence:
//!
//! 1. value lifecycle
//! 2. node lifecycle
//! 3. driver lifecycle
//! 4. status codes (including the add-driver timeout)
//! 5. controller command progress
//!
//! Anything uncorrelated is logged and dropped; nothing here returns an
//! error to the engine's callback thread. Engine calls that may wait on the
//! callback thread are handed back to the caller as [`Deferred`] work.

use chrono::Utc;

use super::command_correlator::{CommandCorrelator, WaitingSignal};
use super::value_codec;
use crate::domain::link_quality::link_quality;
use crate::domain::{EventBus, NetworkId, NetworkRegistry, ValueDescriptor, ZWaveEvent};
use crate::error::ProtocolError;
use crate::transport::{
    ControllerCommand, ControllerState, Notification, NotificationCode, ProtocolVariant,
    TransportSession,
};

/// Value notification flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueChange {
    Added,
    Changed,
}

/// Engine work to run after the gateway lock is released, off the callback
/// thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deferred {
    /// Stop the driver on this address.
    RemoveDriver(String),
}

/// One routing pass over the locked gateway state.
#[derive(Debug)]
pub struct NotificationRouter<'a> {
    /// Network id mapping.
    pub registry: &'a mut NetworkRegistry,
    /// Outstanding controller commands.
    pub correlator: &'a mut CommandCorrelator,
    /// The live engine session.
    pub session: &'a TransportSession,
    /// Destination for domain events.
    pub bus: &'a EventBus,
}

impl NotificationRouter<'_> {
    /// Routes one notification, returning engine work that must not run
    /// under the lock.
    #[must_use]
    pub fn route(&mut self, notification: Notification) -> Option<Deferred> {
        tracing::trace!(kind = notification.kind_str(), "notification received");
        match notification {
            Notification::ValueAdded { value } => self.on_value(&value, ValueChange::Added),
            Notification::ValueChanged { value } | Notification::ValueRefreshed { value } => {
                self.on_value(&value, ValueChange::Changed);
            }
            Notification::ValueRemoved {
                home_id,
                node_id,
                value_id,
            } => {
                if let Some(network_id) = self.network(home_id) {
                    self.publish(ZWaveEvent::ValueRemoved {
                        network_id,
                        node_id,
                        value_id,
                        timestamp: Utc::now(),
                    });
                }
            }

            Notification::NodeNew { home_id, node_id }
            | Notification::NodeAdded { home_id, node_id } => {
                if let Some(network_id) = self.network(home_id) {
                    tracing::info!(%network_id, node_id, "node present");
                    self.publish(ZWaveEvent::NodeAdded {
                        network_id,
                        node_id,
                        timestamp: Utc::now(),
                    });
                }
            }
            Notification::NodeRemoved { home_id, node_id } => {
                if let Some(network_id) = self.network(home_id) {
                    tracing::info!(%network_id, node_id, "node removed");
                    self.publish(ZWaveEvent::NodeRemoved {
                        network_id,
                        node_id,
                        timestamp: Utc::now(),
                    });
                }
            }
            Notification::NodeNaming { home_id, node_id }
            | Notification::NodeProtocolInfo { home_id, node_id } => {
                if let Some(network_id) = self.network(home_id) {
                    self.publish(ZWaveEvent::NodeDataChanged {
                        network_id,
                        node_id,
                        timestamp: Utc::now(),
                    });
                }
            }
            Notification::NodeQueriesComplete { home_id, node_id } => {
                if let Some(network_id) = self.network(home_id) {
                    tracing::debug!(%network_id, node_id, "node queries complete");
                    self.publish(ZWaveEvent::NodeInitialized {
                        network_id,
                        node_id,
                        timestamp: Utc::now(),
                    });
                }
            }

            Notification::DriverReady { home_id } => self.on_driver_ready(home_id),
            Notification::DriverFailed { address } => self.on_driver_failed(address.as_deref()),
            Notification::DriverRemoved { home_id } => {
                tracing::info!(home_id, "driver removed");
            }
            Notification::DriverReset { home_id } => {
                tracing::info!(home_id, "driver reset");
            }

            Notification::Status {
                home_id,
                node_id,
                code,
            } => return self.on_status(home_id, node_id, code),

            Notification::ControllerCommand {
                home_id,
                command,
                state,
            } => self.on_controller_command(home_id, command, state),

            Notification::Group { home_id, node_id } => {
                tracing::debug!(home_id, node_id, "association group changed");
            }
            Notification::NodeEvent {
                home_id,
                node_id,
                event,
            } => {
                tracing::debug!(home_id, node_id, event, "node event");
            }
            Notification::EssentialNodeQueriesComplete { home_id } => {
                tracing::info!(home_id, "essential node queries complete");
            }
            Notification::AwakeNodesQueried { home_id } => {
                tracing::info!(home_id, "awake nodes queried");
            }
            Notification::AllNodesQueried { home_id } => {
                tracing::info!(home_id, "all nodes queried");
            }
            Notification::AllNodesQueriedSomeDead { home_id } => {
                tracing::warn!(home_id, "all nodes queried, some are dead");
            }
            Notification::UserAlert {
                home_id,
                alert,
                message,
            } => {
                tracing::info!(home_id, alert, %message, "user alert");
            }
            Notification::Unknown { kind } => {
                tracing::warn!(kind, "unhandled notification");
            }
        }
        None
    }

    fn on_value(&self, descriptor: &ValueDescriptor, change: ValueChange) {
        let Some(network_id) = self.network(descriptor.home_id) else {
            return;
        };
        let node_id = descriptor.node_id;
        let transport = self.session.transport();

        let timestamp = Utc::now();
        match value_codec::decode(transport.as_ref(), descriptor) {
            Ok(value) => self.publish(match change {
                ValueChange::Added => ZWaveEvent::ValueAdded {
                    network_id,
                    node_id,
                    value,
                    timestamp,
                },
                ValueChange::Changed => ZWaveEvent::ValueChanged {
                    network_id,
                    node_id,
                    value,
                    timestamp,
                },
            }),
            // Link quality and reachability are still reported.
            Err(err) => {
                tracing::warn!(%network_id, node_id, value_id = descriptor.id, error = %err, "dropping undecodable value");
            }
        }

        let statistics = transport.node_statistics(descriptor.home_id, node_id);
        self.publish(ZWaveEvent::NodeLinkQuality {
            network_id,
            node_id,
            quality: link_quality(&statistics, self.session.variant()),
            timestamp,
        });

        if change == ValueChange::Changed {
            self.publish(ZWaveEvent::NodeReachable {
                network_id,
                node_id,
                reachable: true,
                timestamp,
            });
        }
    }

    fn on_driver_ready(&mut self, home_id: u32) {
        let network_id = match self.registry.resolve_ready(home_id) {
            Ok(network_id) => network_id,
            Err(err) => {
                tracing::warn!(error = %err, "ignoring driver ready");
                return;
            }
        };

        if self.session.variant() == ProtocolVariant::Modern {
            let extended = self.session.transport().has_extended_tx_status(home_id);
            tracing::info!(%network_id, home_id, extended_tx_status = extended, "network started");
        } else {
            tracing::info!(%network_id, home_id, "network started");
        }

        self.publish(ZWaveEvent::NetworkStarted {
            network_id,
            home_id,
            timestamp: Utc::now(),
        });
    }

    fn on_driver_failed(&mut self, address: Option<&str>) {
        match self.registry.resolve_failed(address) {
            Ok(identity) => {
                tracing::error!(
                    network_id = %identity.network_id,
                    address = %identity.address,
                    "network setup failed"
                );
                self.publish(ZWaveEvent::NetworkFailed {
                    network_id: identity.network_id,
                    timestamp: Utc::now(),
                });
            }
            Err(err) => tracing::warn!(error = %err, "ignoring driver failure"),
        }
    }

    fn on_status(
        &mut self,
        home_id: u32,
        node_id: u8,
        code: NotificationCode,
    ) -> Option<Deferred> {
        if home_id == 0 && code == NotificationCode::Timeout && self.registry.has_pending() {
            return self.on_setup_timeout();
        }

        let network_id = self.network(home_id)?;
        let timestamp = Utc::now();
        match code {
            NotificationCode::Dead => {
                tracing::warn!(%network_id, node_id, "node presumed dead");
                self.publish(ZWaveEvent::NodeFailed {
                    network_id,
                    node_id,
                    failed: true,
                    timestamp,
                });
                self.publish(ZWaveEvent::NodeReachable {
                    network_id,
                    node_id,
                    reachable: false,
                    timestamp,
                });
            }
            NotificationCode::Timeout => self.publish(ZWaveEvent::NodeReachable {
                network_id,
                node_id,
                reachable: false,
                timestamp,
            }),
            NotificationCode::Alive => self.publish(ZWaveEvent::NodeReachable {
                network_id,
                node_id,
                reachable: true,
                timestamp,
            }),
            NotificationCode::Sleep => self.publish(ZWaveEvent::NodeSleep {
                network_id,
                node_id,
                sleeping: true,
                timestamp,
            }),
            NotificationCode::Awake => self.publish(ZWaveEvent::NodeSleep {
                network_id,
                node_id,
                sleeping: false,
                timestamp,
            }),
            NotificationCode::NoOperation => {
                tracing::debug!(%network_id, node_id, "no-operation status");
            }
            NotificationCode::MsgComplete | NotificationCode::Other(_) => {
                tracing::warn!(%network_id, node_id, ?code, "unhandled status code");
            }
        }
        None
    }

    /// Add-driver timeout: the head of the pending FIFO never came up.
    fn on_setup_timeout(&mut self) -> Option<Deferred> {
        let identity = match self.registry.resolve_failed(None) {
            Ok(identity) => identity,
            Err(err) => {
                tracing::warn!(error = %err, "ignoring driver timeout");
                return None;
            }
        };
        tracing::error!(
            network_id = %identity.network_id,
            address = %identity.address,
            "timed out waiting for driver"
        );
        self.publish(ZWaveEvent::NetworkFailed {
            network_id: identity.network_id,
            timestamp: Utc::now(),
        });
        Some(Deferred::RemoveDriver(identity.address))
    }

    fn on_controller_command(
        &mut self,
        home_id: u32,
        command: ControllerCommand,
        state: ControllerState,
    ) {
        let signals =
            self.correlator
                .on_controller_state(home_id, command, state, self.session.variant());
        if signals.is_empty() {
            return;
        }
        let Some(network_id) = self.network(home_id) else {
            return;
        };
        publish_signals(self.bus, network_id, &signals);
    }

    /// Reverse lookup that logs uncorrelated handles.
    fn network(&self, home_id: u32) -> Option<NetworkId> {
        let network_id = self.registry.reverse_lookup(home_id);
        if network_id.is_none() {
            tracing::warn!(error = %ProtocolError::UnknownHandle(home_id), "dropping notification");
        }
        network_id
    }

    fn publish(&self, event: ZWaveEvent) {
        let _ = self.bus.publish(event);
    }
}

/// Publishes waiting level signals for `network_id`.
pub fn publish_signals(bus: &EventBus, network_id: NetworkId, signals: &[WaitingSignal]) {
    let timestamp = Utc::now();
    for signal in signals {
        let event = match *signal {
            WaitingSignal::Addition(waiting) => ZWaveEvent::WaitingForNodeAddition {
                network_id,
                waiting,
                timestamp,
            },
            WaitingSignal::Removal(waiting) => ZWaveEvent::WaitingForNodeRemoval {
                network_id,
                waiting,
                timestamp,
            },
        };
        let _ = bus.publish(event);
    }
}
