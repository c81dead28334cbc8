//! Interface to the external Z-Wave transport engine.
//!
//! The engine is a black box: it accepts commands through [`Transport`] and
//! delivers every notification through the single [`NotificationWatcher`]
//! registered when the [`TransportFactory`] creates it. Host processes
//! implement both traits on top of their engine binding.
//!
//! Calls that the engine reports as `false` or that throw are returned as
//! [`TransportError`]; the gateway converts them before they reach the
//! notification router.

pub mod notification;
pub mod session;

use std::fmt;
use std::sync::Arc;

use crate::domain::ValueDescriptor;
use crate::error::TransportError;

pub use notification::{ControllerCommand, ControllerState, Notification, NotificationCode};
pub use session::{SessionOptions, TransportSession};

/// Which flavour of the engine's notification contract is in use.
///
/// Resolved once when the session is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolVariant {
    /// Older engines: controller-command notifications never name the
    /// command, driver-failed carries no address, link statistics expose a
    /// single quality metric.
    Legacy,
    /// Newer engines: command kind and driver address are reported, link
    /// statistics expose RSSI samples.
    Modern,
}

/// Per-node link statistics read from the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeStatistics {
    /// Single signal-quality metric (legacy engines).
    pub quality: i32,
    /// RSSI samples as reported: numbers, `"MAX"` or `"MIN"` (modern engines).
    pub rssi: Vec<String>,
}

/// Typed value write handed to the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueWrite {
    /// Set a boolean.
    Bool(bool),
    /// Set an unsigned byte.
    Byte(u8),
    /// Set a signed short.
    Short(i16),
    /// Set a signed int.
    Int(i32),
    /// Set a decimal.
    Float(f32),
    /// Set a string.
    String(String),
    /// Select a list item by its label.
    ListSelection(String),
    /// Press a button value.
    PressButton,
    /// Release a button value.
    ReleaseButton,
}

/// Commands and queries accepted by the transport engine.
///
/// Node and controller attribute getters are infallible: the engine answers
/// with its own defaults for nodes it does not know.
///
/// Command calls are made with the gateway lock held. An implementation must
/// deliver notifications from its own callback thread and never
/// re-entrantly from inside a call, and no call except
/// [`Transport::remove_driver`] may wait on the callback thread.
pub trait Transport: Send + Sync + fmt::Debug {
    /// Contract variant of this engine build.
    fn protocol_variant(&self) -> ProtocolVariant;

    /// Starts a driver on `address`. Readiness is reported later.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the engine refuses the driver.
    fn add_driver(&self, address: &str) -> Result<(), TransportError>;

    /// Stops the driver on `address`.
    ///
    /// May block until the engine's callback thread has exited. The gateway
    /// never calls this while holding its state lock, nor from the callback
    /// thread itself.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the engine has no such driver.
    fn remove_driver(&self, address: &str) -> Result<(), TransportError>;

    /// Factory-resets the controller; a new driver-ready follows.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the engine refuses the reset.
    fn reset_controller(&self, home_id: u32) -> Result<(), TransportError>;

    /// Starts node inclusion.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the engine refuses the command.
    fn add_node(&self, home_id: u32, use_security: bool) -> Result<(), TransportError>;

    /// Starts node exclusion.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the engine refuses the command.
    fn remove_node(&self, home_id: u32) -> Result<(), TransportError>;

    /// Removes a node from the controller's failed-node list.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the engine refuses the command.
    fn remove_failed_node(&self, home_id: u32, node_id: u8) -> Result<(), TransportError>;

    /// Cancels whatever controller command is running.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if nothing could be cancelled.
    fn cancel_controller_command(&self, home_id: u32) -> Result<(), TransportError>;

    /// Node id of the controller itself.
    fn controller_node_id(&self, home_id: u32) -> u8;
    /// Whether the controller is the primary controller.
    fn is_primary_controller(&self, home_id: u32) -> bool;
    /// Whether the controller is a static update controller (SUC).
    fn is_static_update_controller(&self, home_id: u32) -> bool;
    /// Whether the controller is a bridge controller.
    fn is_bridge_controller(&self, home_id: u32) -> bool;
    /// Whether the controller reports extended TX status.
    fn has_extended_tx_status(&self, _home_id: u32) -> bool {
        false
    }

    /// User-assigned node name.
    fn node_name(&self, home_id: u32, node_id: u8) -> String;
    /// Raw basic device class.
    fn node_basic(&self, home_id: u32, node_id: u8) -> u8;
    /// Raw Z-Wave+ device type.
    fn node_device_type(&self, home_id: u32, node_id: u8) -> u16;
    /// Raw Z-Wave+ role type.
    fn node_role(&self, home_id: u32, node_id: u8) -> u8;
    /// Raw security flags.
    fn node_security(&self, home_id: u32, node_id: u8) -> u8;
    /// Raw Z-Wave+ node type.
    fn node_plus_type(&self, home_id: u32, node_id: u8) -> u8;
    /// Manufacturer id as a hex string.
    fn node_manufacturer_id(&self, home_id: u32, node_id: u8) -> String;
    /// Manufacturer name.
    fn node_manufacturer_name(&self, home_id: u32, node_id: u8) -> String;
    /// Product id as a hex string.
    fn node_product_id(&self, home_id: u32, node_id: u8) -> String;
    /// Product name.
    fn node_product_name(&self, home_id: u32, node_id: u8) -> String;
    /// Product type as a hex string.
    fn node_product_type(&self, home_id: u32, node_id: u8) -> String;
    /// Protocol version.
    fn node_version(&self, home_id: u32, node_id: u8) -> u8;
    /// Whether the node is a Z-Wave+ device.
    fn is_node_zwave_plus(&self, home_id: u32, node_id: u8) -> bool;
    /// Whether the node supports beaming.
    fn is_node_beaming_device(&self, home_id: u32, node_id: u8) -> bool;
    /// Whether the node is awake.
    fn is_node_awake(&self, home_id: u32, node_id: u8) -> bool;
    /// Whether the controller considers the node failed.
    fn is_node_failed(&self, home_id: u32, node_id: u8) -> bool;
    /// Link statistics for the node.
    fn node_statistics(&self, home_id: u32, node_id: u8) -> NodeStatistics;

    /// Reads a `Bool` or `Button` value.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the value cannot be read.
    fn value_as_bool(&self, value: &ValueDescriptor) -> Result<bool, TransportError>;

    /// Reads a `Byte` value.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the value cannot be read.
    fn value_as_byte(&self, value: &ValueDescriptor) -> Result<u8, TransportError>;

    /// Reads a `Short` value.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the value cannot be read.
    fn value_as_short(&self, value: &ValueDescriptor) -> Result<i16, TransportError>;

    /// Reads an `Int` value.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the value cannot be read.
    fn value_as_int(&self, value: &ValueDescriptor) -> Result<i32, TransportError>;

    /// Reads a `Decimal` value.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the value cannot be read.
    fn value_as_float(&self, value: &ValueDescriptor) -> Result<f32, TransportError>;

    /// Reads a `String` value.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the value cannot be read.
    fn value_as_string(&self, value: &ValueDescriptor) -> Result<String, TransportError>;

    /// Reads the items of a `List` value.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the value cannot be read.
    fn value_list_items(&self, value: &ValueDescriptor) -> Result<Vec<String>, TransportError>;

    /// Reads the selected item label of a `List` value.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the value cannot be read.
    fn value_list_selection(&self, value: &ValueDescriptor) -> Result<String, TransportError>;

    /// Help text for a value.
    fn value_help(&self, value: &ValueDescriptor) -> String;

    /// Writes a value addressed by home id and engine value id.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the engine rejects the write.
    fn write_value(
        &self,
        home_id: u32,
        value_id: u64,
        write: ValueWrite,
    ) -> Result<(), TransportError>;
}

/// Creates transport engine instances.
///
/// Called when the first network starts; the returned engine lives until
/// the last network stops.
pub trait TransportFactory: Send + Sync + fmt::Debug {
    /// Creates and configures an engine and registers `watcher` as its only
    /// notification callback.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the engine cannot be created.
    fn create(
        &self,
        options: &SessionOptions,
        watcher: NotificationWatcher,
    ) -> Result<Arc<dyn Transport>, TransportError>;
}

/// The single notification callback handed to the engine.
///
/// The engine invokes [`NotificationWatcher::notify`] from its own callback
/// thread, strictly serially.
#[derive(Clone)]
pub struct NotificationWatcher {
    callback: Arc<dyn Fn(Notification) + Send + Sync>,
}

impl NotificationWatcher {
    /// Wraps a callback.
    pub fn new(callback: impl Fn(Notification) + Send + Sync + 'static) -> Self {
        Self {
            callback: Arc::new(callback),
        }
    }

    /// Delivers one notification.
    pub fn notify(&self, notification: Notification) {
        (self.callback)(notification);
    }
}

impl fmt::Debug for NotificationWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationWatcher").finish_non_exhaustive()
    }
}
