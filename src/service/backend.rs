//! Gateway facade: network lifecycle, queries, writes and controller
//! commands.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::command_correlator::{CommandCorrelator, CommandKind};
use super::notification_router::{Deferred, NotificationRouter, publish_signals};
use super::value_codec;
use crate::config::GatewayConfig;
use crate::domain::link_quality::link_quality;
use crate::domain::node::{NodeBasicType, NodeRole, parse_hex_id};
use crate::domain::reply::{self, CommandReply};
use crate::domain::{
    CommandClass, DomainValue, EventBus, NetworkId, NetworkRegistry, ValueDescriptor, ValueGenre,
    ValueType,
};
use crate::error::{GatewayError, TransportError};
use crate::transport::{
    Notification, NotificationWatcher, SessionOptions, Transport, TransportFactory,
    TransportSession,
};

/// State guarded by the single gateway lock.
#[derive(Debug, Default)]
struct GatewayState {
    registry: NetworkRegistry,
    correlator: CommandCorrelator,
    session: Option<TransportSession>,
}

impl GatewayState {
    /// Home id and engine for a configured network.
    fn resolve(&self, network_id: NetworkId) -> Option<(u32, Arc<dyn Transport>)> {
        let home_id = self.registry.lookup(network_id)?;
        let session = self.session.as_ref()?;
        Some((home_id, Arc::clone(session.transport())))
    }

    /// Takes the session out once no network is left.
    fn retire_session_if_idle(&mut self) -> Option<TransportSession> {
        if self.registry.is_empty() {
            self.session.take()
        } else {
            None
        }
    }
}

#[derive(Debug)]
struct Inner {
    factory: Arc<dyn TransportFactory>,
    config: GatewayConfig,
    event_bus: EventBus,
    state: Mutex<GatewayState>,
}

impl Inner {
    fn handle_notification(&self, notification: Notification) {
        let mut guard = self.state.lock();
        let GatewayState {
            registry,
            correlator,
            session,
        } = &mut *guard;
        let Some(session) = session.as_ref() else {
            tracing::debug!(
                kind = notification.kind_str(),
                "notification after session teardown"
            );
            return;
        };
        let transport = Arc::clone(session.transport());
        let deferred = NotificationRouter {
            registry,
            correlator,
            session,
            bus: &self.event_bus,
        }
        .route(notification);
        drop(guard);

        if let Some(work) = deferred {
            run_deferred(transport, work);
        }
    }
}

/// Runs engine work on a helper thread; the callback thread cannot wait on
/// itself.
fn run_deferred(transport: Arc<dyn Transport>, work: Deferred) {
    let spawned = std::thread::Builder::new()
        .name("zwave-deferred".to_string())
        .spawn(move || match work {
            Deferred::RemoveDriver(address) => {
                if let Err(err) = transport.remove_driver(&address) {
                    tracing::warn!(%address, error = %err, "failed to remove timed out driver");
                }
            }
        });
    if let Err(err) = spawned {
        tracing::error!(error = %err, "failed to spawn deferred engine work");
    }
}

/// Correlation layer between the application and the transport engine.
///
/// All registry, correlator and session state sits behind one
/// [`parking_lot::Mutex`] shared by callers and the engine's callback
/// thread, so "is a command outstanding" and "record the new command" are
/// atomic with respect to notifications. The lock is held across the
/// engine's command calls; engines must deliver notifications from their
/// own thread, never re-entrantly from inside a command call. Driver
/// removal, which may join that thread, always runs with the lock released
/// and never on the callback thread.
///
/// Cloning is cheap and shares the same state.
#[derive(Debug, Clone)]
pub struct ZWaveBackend {
    inner: Arc<Inner>,
}

impl ZWaveBackend {
    /// Creates a backend. No engine is created until the first network
    /// starts.
    #[must_use]
    pub fn new(factory: Arc<dyn TransportFactory>, config: GatewayConfig) -> Self {
        let event_bus = EventBus::new(config.event_bus_capacity);
        Self {
            inner: Arc::new(Inner {
                factory,
                config,
                event_bus,
                state: Mutex::new(GatewayState::default()),
            }),
        }
    }

    /// Returns a reference to the domain [`EventBus`].
    #[must_use]
    pub fn event_bus(&self) -> &EventBus {
        &self.inner.event_bus
    }

    /// Entry point for the engine's callback thread.
    pub fn handle_notification(&self, notification: Notification) {
        self.inner.handle_notification(notification);
    }

    fn watcher(&self) -> NotificationWatcher {
        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        NotificationWatcher::new(move |notification| {
            if let Some(inner) = inner.upgrade() {
                inner.handle_notification(notification);
            }
        })
    }

    // ── Network lifecycle ───────────────────────────────────────────────

    /// Starts a network on the transport `address`.
    ///
    /// The first start creates the engine session. The network becomes
    /// usable once the engine reports its driver ready (a network-started
    /// event is emitted).
    ///
    /// # Errors
    ///
    /// - [`GatewayError::AlreadyConfiguring`] if the id is configured or pending.
    /// - [`GatewayError::InvalidNetworkKey`] for a malformed key.
    /// - [`GatewayError::ConfigurationConflict`] if a session with a
    ///   different key is active.
    /// - [`GatewayError::BackendError`] if the engine cannot be created or
    ///   refuses the driver.
    pub fn start_network(
        &self,
        network_id: NetworkId,
        address: &str,
        network_key: Option<&str>,
    ) -> Result<(), GatewayError> {
        // A session left over after every setup failed is reopened fresh.
        let stale = self.inner.state.lock().retire_session_if_idle();
        drop(stale);

        let watcher = self.watcher();
        let mut state = self.inner.state.lock();
        if state.registry.identity(network_id).is_some() {
            return Err(GatewayError::AlreadyConfiguring(network_id));
        }

        let transport = match &state.session {
            Some(session) => {
                session.check_compatible(network_key)?;
                Arc::clone(session.transport())
            }
            None => {
                let options = SessionOptions::from_config(&self.inner.config, network_key)?;
                let session =
                    TransportSession::open(self.inner.factory.as_ref(), options, watcher)?;
                let transport = Arc::clone(session.transport());
                state.session = Some(session);
                transport
            }
        };

        state.registry.begin_setup(network_id, address)?;
        if let Err(err) = transport.add_driver(address) {
            tracing::error!(%network_id, address, error = %err, "failed to add driver");
            let _ = state.registry.remove(network_id);
            let retired = state.retire_session_if_idle();
            drop(state);
            drop(retired);
            return Err(err.into());
        }

        tracing::info!(%network_id, address, "network setup started");
        Ok(())
    }

    /// Stops a network, pending or configured.
    ///
    /// Removes the driver and fails any outstanding controller command with
    /// [`GatewayError::BackendError`]. Stopping the last network tears the
    /// engine session down.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NetworkNotFound`] if the id is unknown.
    pub fn stop_network(&self, network_id: NetworkId) -> Result<(), GatewayError> {
        let mut state = self.inner.state.lock();
        let identity = state.registry.remove(network_id)?;

        if let Some(home_id) = identity.home_id {
            let signals = state.correlator.abandon(home_id, "network stopped");
            publish_signals(&self.inner.event_bus, network_id, &signals);
        }
        let transport = state
            .session
            .as_ref()
            .map(|session| Arc::clone(session.transport()));
        let retired = state.retire_session_if_idle();
        drop(state);

        // The engine joins its callback thread here, which may be waiting
        // for the lock.
        if let Some(transport) = transport
            && let Err(err) = transport.remove_driver(&identity.address)
        {
            tracing::warn!(%network_id, address = %identity.address, error = %err, "failed to remove driver");
        }
        if let Some(session) = retired {
            tracing::info!(variant = ?session.variant(), "transport session closed");
            drop(session);
        }

        tracing::info!(%network_id, "network stopped");
        Ok(())
    }

    /// Factory-resets the controller of a network.
    ///
    /// The network goes back to pending; the engine's next driver-ready
    /// rebinds it. An outstanding controller command is failed with
    /// [`GatewayError::BackendError`].
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NetworkNotFound`] if the network has no home
    /// id, or [`GatewayError::BackendError`] if the engine refuses the reset.
    pub fn factory_reset_network(&self, network_id: NetworkId) -> Result<(), GatewayError> {
        let mut state = self.inner.state.lock();
        let (home_id, transport) = state
            .resolve(network_id)
            .ok_or(GatewayError::NetworkNotFound(network_id))?;

        transport.reset_controller(home_id).map_err(|err| {
            tracing::warn!(%network_id, home_id, error = %err, "controller reset rejected");
            GatewayError::from(err)
        })?;

        let signals = state.correlator.abandon(home_id, "controller reset");
        publish_signals(&self.inner.event_bus, network_id, &signals);
        let _ = state.registry.begin_reset(network_id)?;

        tracing::info!(%network_id, home_id, "controller reset, waiting for driver");
        Ok(())
    }

    // ── Controller queries ─────────────────────────────────────────────

    fn query<T>(
        &self,
        network_id: NetworkId,
        default: T,
        read: impl FnOnce(&dyn Transport, u32) -> T,
    ) -> T {
        let resolved = self.inner.state.lock().resolve(network_id);
        match resolved {
            Some((home_id, transport)) => read(transport.as_ref(), home_id),
            None => default,
        }
    }

    /// Transport home id of a network, `0` if unknown.
    #[must_use]
    pub fn home_id(&self, network_id: NetworkId) -> u32 {
        self.inner.state.lock().registry.lookup(network_id).unwrap_or(0)
    }

    /// Node id of the network's controller, `0` if unknown.
    #[must_use]
    pub fn controller_node_id(&self, network_id: NetworkId) -> u8 {
        self.query(network_id, 0, |t, home| t.controller_node_id(home))
    }

    /// Whether the controller is the primary controller.
    #[must_use]
    pub fn is_primary_controller(&self, network_id: NetworkId) -> bool {
        self.query(network_id, false, |t, home| t.is_primary_controller(home))
    }

    /// Whether the controller is a static update controller.
    #[must_use]
    pub fn is_static_update_controller(&self, network_id: NetworkId) -> bool {
        self.query(network_id, false, |t, home| t.is_static_update_controller(home))
    }

    /// Whether the controller is a bridge controller.
    #[must_use]
    pub fn is_bridge_controller(&self, network_id: NetworkId) -> bool {
        self.query(network_id, false, |t, home| t.is_bridge_controller(home))
    }

    // ── Node queries ───────────────────────────────────────────────────

    /// User-assigned node name.
    #[must_use]
    pub fn node_name(&self, network_id: NetworkId, node_id: u8) -> String {
        self.query(network_id, String::new(), |t, home| t.node_name(home, node_id))
    }

    /// Basic device class.
    #[must_use]
    pub fn node_basic_type(&self, network_id: NetworkId, node_id: u8) -> NodeBasicType {
        self.query(network_id, NodeBasicType::Unknown, |t, home| {
            NodeBasicType::from(t.node_basic(home, node_id))
        })
    }

    /// Z-Wave+ device type.
    #[must_use]
    pub fn node_device_type(&self, network_id: NetworkId, node_id: u8) -> u16 {
        self.query(network_id, 0, |t, home| t.node_device_type(home, node_id))
    }

    /// Z-Wave+ role.
    #[must_use]
    pub fn node_role(&self, network_id: NetworkId, node_id: u8) -> NodeRole {
        self.query(network_id, NodeRole::Unknown, |t, home| {
            NodeRole::from(t.node_role(home, node_id))
        })
    }

    /// Raw security flags.
    #[must_use]
    pub fn node_security(&self, network_id: NetworkId, node_id: u8) -> u8 {
        self.query(network_id, 0, |t, home| t.node_security(home, node_id))
    }

    /// Z-Wave+ node type.
    #[must_use]
    pub fn node_plus_type(&self, network_id: NetworkId, node_id: u8) -> u8 {
        self.query(network_id, 0, |t, home| t.node_plus_type(home, node_id))
    }

    /// Manufacturer id, `0` if unknown or unparsable.
    #[must_use]
    pub fn node_manufacturer_id(&self, network_id: NetworkId, node_id: u8) -> u16 {
        self.query(network_id, 0, |t, home| {
            parse_hex_id(&t.node_manufacturer_id(home, node_id))
        })
    }

    /// Manufacturer name.
    #[must_use]
    pub fn node_manufacturer_name(&self, network_id: NetworkId, node_id: u8) -> String {
        self.query(network_id, String::new(), |t, home| {
            t.node_manufacturer_name(home, node_id)
        })
    }

    /// Product id, `0` if unknown or unparsable.
    #[must_use]
    pub fn node_product_id(&self, network_id: NetworkId, node_id: u8) -> u16 {
        self.query(network_id, 0, |t, home| {
            parse_hex_id(&t.node_product_id(home, node_id))
        })
    }

    /// Product name.
    #[must_use]
    pub fn node_product_name(&self, network_id: NetworkId, node_id: u8) -> String {
        self.query(network_id, String::new(), |t, home| {
            t.node_product_name(home, node_id)
        })
    }

    /// Product type, `0` if unknown or unparsable.
    #[must_use]
    pub fn node_product_type(&self, network_id: NetworkId, node_id: u8) -> u16 {
        self.query(network_id, 0, |t, home| {
            parse_hex_id(&t.node_product_type(home, node_id))
        })
    }

    /// Protocol version.
    #[must_use]
    pub fn node_version(&self, network_id: NetworkId, node_id: u8) -> u8 {
        self.query(network_id, 0, |t, home| t.node_version(home, node_id))
    }

    /// Whether the node is a Z-Wave+ device.
    #[must_use]
    pub fn is_node_zwave_plus(&self, network_id: NetworkId, node_id: u8) -> bool {
        self.query(network_id, false, |t, home| t.is_node_zwave_plus(home, node_id))
    }

    /// Whether the node was included securely.
    ///
    /// Reads the security command class's system flag; a failed read counts
    /// as not secure.
    #[must_use]
    pub fn is_node_secure(&self, network_id: NetworkId, node_id: u8) -> bool {
        self.query(network_id, false, |t, home| {
            let flag = ValueDescriptor::compose(
                home,
                node_id,
                ValueGenre::System,
                CommandClass::SECURITY,
                0,
                0,
                ValueType::Bool,
            );
            t.value_as_bool(&flag).unwrap_or_else(|err| {
                tracing::debug!(%network_id, node_id, error = %err, "no security flag");
                false
            })
        })
    }

    /// Whether the node supports beaming.
    #[must_use]
    pub fn is_node_beaming_device(&self, network_id: NetworkId, node_id: u8) -> bool {
        self.query(network_id, false, |t, home| {
            t.is_node_beaming_device(home, node_id)
        })
    }

    /// Whether the node is awake.
    #[must_use]
    pub fn is_node_awake(&self, network_id: NetworkId, node_id: u8) -> bool {
        self.query(network_id, false, |t, home| t.is_node_awake(home, node_id))
    }

    /// Whether the controller considers the node failed.
    #[must_use]
    pub fn is_node_failed(&self, network_id: NetworkId, node_id: u8) -> bool {
        self.query(network_id, false, |t, home| t.is_node_failed(home, node_id))
    }

    /// Normalized link quality in `0..=100`.
    #[must_use]
    pub fn node_link_quality(&self, network_id: NetworkId, node_id: u8) -> u8 {
        let resolved = {
            let state = self.inner.state.lock();
            state
                .resolve(network_id)
                .zip(state.session.as_ref().map(TransportSession::variant))
        };
        match resolved {
            Some(((home_id, transport), variant)) => {
                link_quality(&transport.node_statistics(home_id, node_id), variant)
            }
            None => 0,
        }
    }

    // ── Writes ─────────────────────────────────────────────────────────

    /// Writes a value on a network.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::NetworkNotFound`] if the network has no home id.
    /// - [`GatewayError::InvalidSelection`] or [`GatewayError::InvalidValue`]
    ///   if the value cannot be written; the engine is not contacted.
    /// - [`GatewayError::BackendError`] if the engine rejects the write.
    pub fn set_value(&self, network_id: NetworkId, value: &DomainValue) -> Result<(), GatewayError> {
        let (home_id, transport) = self
            .inner
            .state
            .lock()
            .resolve(network_id)
            .ok_or(GatewayError::NetworkNotFound(network_id))?;
        tracing::debug!(%network_id, value_id = value.id, "setting value");
        value_codec::encode(transport.as_ref(), home_id, value)
    }

    // ── Controller commands ────────────────────────────────────────────

    fn issue(
        &self,
        network_id: NetworkId,
        kind: CommandKind,
        call: impl FnOnce(&dyn Transport, u32) -> Result<(), TransportError>,
    ) -> CommandReply {
        let mut state = self.inner.state.lock();
        let Some((home_id, transport)) = state.resolve(network_id) else {
            return reply::resolved(Err(GatewayError::NetworkNotFound(network_id)));
        };
        tracing::info!(%network_id, home_id, ?kind, "issuing controller command");
        state
            .correlator
            .issue(network_id, home_id, kind, || call(transport.as_ref(), home_id))
    }

    /// Starts node inclusion.
    ///
    /// The reply resolves with success once the controller waits for the
    /// device, or with an error if the command cannot start. A
    /// waiting-for-node-addition signal follows.
    #[must_use = "the reply reports whether inclusion started"]
    pub fn add_node(&self, network_id: NetworkId, use_security: bool) -> CommandReply {
        self.issue(network_id, CommandKind::AddDevice, |t, home| {
            t.add_node(home, use_security)
        })
    }

    /// Starts node exclusion.
    #[must_use = "the reply reports whether exclusion started"]
    pub fn remove_node(&self, network_id: NetworkId) -> CommandReply {
        self.issue(network_id, CommandKind::RemoveDevice, |t, home| t.remove_node(home))
    }

    /// Removes a node from the controller's failed-node list.
    ///
    /// The reply resolves when the engine reports the removal completed or
    /// refused.
    #[must_use = "the reply reports whether the node was removed"]
    pub fn remove_failed_node(&self, network_id: NetworkId, node_id: u8) -> CommandReply {
        self.issue(network_id, CommandKind::RemoveFailedNode, |t, home| {
            t.remove_failed_node(home, node_id)
        })
    }

    /// Asks the engine to cancel the running controller command.
    ///
    /// Resolves immediately from the engine's acknowledgement. On success
    /// the outstanding command (if any) is dropped: its unresolved reply
    /// resolves with [`GatewayError::Cancelled`] and any waiting signal it
    /// raised is turned off.
    #[must_use = "the reply reports whether the engine accepted the cancel"]
    pub fn cancel_pending_operation(&self, network_id: NetworkId) -> CommandReply {
        let mut state = self.inner.state.lock();
        let Some((home_id, transport)) = state.resolve(network_id) else {
            return reply::resolved(Err(GatewayError::NetworkNotFound(network_id)));
        };

        if let Err(err) = transport.cancel_controller_command(home_id) {
            tracing::warn!(%network_id, home_id, error = %err, "cancel rejected");
            return reply::resolved(Err(err.into()));
        }

        let signals = state.correlator.cancel(home_id);
        publish_signals(&self.inner.event_bus, network_id, &signals);
        tracing::info!(%network_id, home_id, "controller command cancelled");
        reply::resolved(Ok(()))
    }
}
