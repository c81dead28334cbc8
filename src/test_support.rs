//! In-memory transport engine for tests.
//!
//! [`FakeTransport`] records every command, answers queries from a small
//! programmable value table, and can be told to reject specific calls.
//! [`FakeFactory`] keeps the registered watcher so tests can play the
//! engine's callback thread.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::domain::ValueDescriptor;
use crate::error::TransportError;
use crate::transport::{
    Notification, NodeStatistics, NotificationWatcher, ProtocolVariant, SessionOptions, Transport,
    TransportFactory, ValueWrite,
};

/// A command the fake engine received.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    AddDriver(String),
    RemoveDriver(String),
    ResetController(u32),
    AddNode(u32, bool),
    RemoveNode(u32),
    RemoveFailedNode(u32, u8),
    CancelControllerCommand(u32),
    WriteValue(u32, u64, ValueWrite),
}

/// Stored contents of a fake value.
#[derive(Debug, Clone, PartialEq)]
pub enum FakeValue {
    Bool(bool),
    Byte(u8),
    Short(i16),
    Int(i32),
    Float(f32),
    Text(String),
    List { items: Vec<String>, selected: String },
}

#[derive(Debug, Default)]
struct FakeState {
    calls: Vec<Call>,
    rejected: HashSet<&'static str>,
    values: HashMap<u64, FakeValue>,
    throwing: HashSet<u64>,
    statistics: NodeStatistics,
}

/// One-shot callback run from inside `remove_driver`.
type RemoveDriverHook = Box<dyn FnOnce() + Send>;

pub struct FakeTransport {
    variant: ProtocolVariant,
    state: Mutex<FakeState>,
    remove_driver_hook: Mutex<Option<RemoveDriverHook>>,
}

impl fmt::Debug for FakeTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeTransport")
            .field("variant", &self.variant)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl FakeTransport {
    pub fn legacy() -> Self {
        Self::with_variant(ProtocolVariant::Legacy)
    }

    pub fn modern() -> Self {
        Self::with_variant(ProtocolVariant::Modern)
    }

    fn with_variant(variant: ProtocolVariant) -> Self {
        Self {
            variant,
            state: Mutex::new(FakeState {
                statistics: NodeStatistics {
                    quality: -70,
                    rssi: vec!["-70".to_string(); 5],
                },
                ..FakeState::default()
            }),
            remove_driver_hook: Mutex::new(None),
        }
    }

    /// Runs `hook` inside the next `remove_driver`, after the call is
    /// recorded. Stands in for an engine that joins its callback thread.
    pub fn on_remove_driver(&self, hook: impl FnOnce() + Send + 'static) {
        *self.remove_driver_hook.lock() = Some(Box::new(hook));
    }

    /// Makes the named operation fail from now on.
    pub fn reject(&self, op: &'static str) {
        self.state.lock().rejected.insert(op);
    }

    /// Makes the named operation succeed again.
    pub fn accept(&self, op: &'static str) {
        self.state.lock().rejected.remove(op);
    }

    pub fn set_value(&self, value_id: u64, value: FakeValue) {
        self.state.lock().values.insert(value_id, value);
    }

    /// Makes every read of `value_id` throw.
    pub fn throw_on(&self, value_id: u64) {
        self.state.lock().throwing.insert(value_id);
    }

    pub fn set_statistics(&self, statistics: NodeStatistics) {
        self.state.lock().statistics = statistics;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    fn command(&self, op: &'static str, call: Call) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        state.calls.push(call);
        if state.rejected.contains(op) {
            return Err(TransportError::Rejected(op));
        }
        Ok(())
    }

    fn read(&self, value: &ValueDescriptor) -> Result<FakeValue, TransportError> {
        let state = self.state.lock();
        if state.throwing.contains(&value.id) {
            return Err(TransportError::Exception(format!("invalid value id {}", value.id)));
        }
        state
            .values
            .get(&value.id)
            .cloned()
            .ok_or_else(|| TransportError::Exception(format!("unknown value id {}", value.id)))
    }
}

fn mismatch(value: &ValueDescriptor) -> TransportError {
    TransportError::Exception(format!("type mismatch for value id {}", value.id))
}

impl Transport for FakeTransport {
    fn protocol_variant(&self) -> ProtocolVariant {
        self.variant
    }

    fn add_driver(&self, address: &str) -> Result<(), TransportError> {
        self.command("add_driver", Call::AddDriver(address.to_string()))
    }

    fn remove_driver(&self, address: &str) -> Result<(), TransportError> {
        let result = self.command("remove_driver", Call::RemoveDriver(address.to_string()));
        let hook = self.remove_driver_hook.lock().take();
        if let Some(hook) = hook {
            hook();
        }
        result
    }

    fn reset_controller(&self, home_id: u32) -> Result<(), TransportError> {
        self.command("reset_controller", Call::ResetController(home_id))
    }

    fn add_node(&self, home_id: u32, use_security: bool) -> Result<(), TransportError> {
        self.command("add_node", Call::AddNode(home_id, use_security))
    }

    fn remove_node(&self, home_id: u32) -> Result<(), TransportError> {
        self.command("remove_node", Call::RemoveNode(home_id))
    }

    fn remove_failed_node(&self, home_id: u32, node_id: u8) -> Result<(), TransportError> {
        self.command("remove_failed_node", Call::RemoveFailedNode(home_id, node_id))
    }

    fn cancel_controller_command(&self, home_id: u32) -> Result<(), TransportError> {
        self.command("cancel", Call::CancelControllerCommand(home_id))
    }

    fn controller_node_id(&self, _home_id: u32) -> u8 {
        1
    }

    fn is_primary_controller(&self, _home_id: u32) -> bool {
        true
    }

    fn is_static_update_controller(&self, _home_id: u32) -> bool {
        true
    }

    fn is_bridge_controller(&self, _home_id: u32) -> bool {
        false
    }

    fn node_name(&self, _home_id: u32, node_id: u8) -> String {
        format!("node-{node_id}")
    }

    fn node_basic(&self, _home_id: u32, _node_id: u8) -> u8 {
        0x04
    }

    fn node_device_type(&self, _home_id: u32, _node_id: u8) -> u16 {
        0x0700
    }

    fn node_role(&self, _home_id: u32, _node_id: u8) -> u8 {
        0x05
    }

    fn node_security(&self, _home_id: u32, _node_id: u8) -> u8 {
        0
    }

    fn node_plus_type(&self, _home_id: u32, _node_id: u8) -> u8 {
        0
    }

    fn node_manufacturer_id(&self, _home_id: u32, _node_id: u8) -> String {
        "0x010f".to_string()
    }

    fn node_manufacturer_name(&self, _home_id: u32, _node_id: u8) -> String {
        "Fibargroup".to_string()
    }

    fn node_product_id(&self, _home_id: u32, _node_id: u8) -> String {
        "0x1000".to_string()
    }

    fn node_product_name(&self, _home_id: u32, _node_id: u8) -> String {
        "Wall Plug".to_string()
    }

    fn node_product_type(&self, _home_id: u32, _node_id: u8) -> String {
        "garbage".to_string()
    }

    fn node_version(&self, _home_id: u32, _node_id: u8) -> u8 {
        4
    }

    fn is_node_zwave_plus(&self, _home_id: u32, _node_id: u8) -> bool {
        true
    }

    fn is_node_beaming_device(&self, _home_id: u32, _node_id: u8) -> bool {
        true
    }

    fn is_node_awake(&self, _home_id: u32, _node_id: u8) -> bool {
        true
    }

    fn is_node_failed(&self, _home_id: u32, _node_id: u8) -> bool {
        false
    }

    fn node_statistics(&self, _home_id: u32, _node_id: u8) -> NodeStatistics {
        self.state.lock().statistics.clone()
    }

    fn value_as_bool(&self, value: &ValueDescriptor) -> Result<bool, TransportError> {
        match self.read(value)? {
            FakeValue::Bool(v) => Ok(v),
            _ => Err(mismatch(value)),
        }
    }

    fn value_as_byte(&self, value: &ValueDescriptor) -> Result<u8, TransportError> {
        match self.read(value)? {
            FakeValue::Byte(v) => Ok(v),
            _ => Err(mismatch(value)),
        }
    }

    fn value_as_short(&self, value: &ValueDescriptor) -> Result<i16, TransportError> {
        match self.read(value)? {
            FakeValue::Short(v) => Ok(v),
            _ => Err(mismatch(value)),
        }
    }

    fn value_as_int(&self, value: &ValueDescriptor) -> Result<i32, TransportError> {
        match self.read(value)? {
            FakeValue::Int(v) => Ok(v),
            _ => Err(mismatch(value)),
        }
    }

    fn value_as_float(&self, value: &ValueDescriptor) -> Result<f32, TransportError> {
        match self.read(value)? {
            FakeValue::Float(v) => Ok(v),
            _ => Err(mismatch(value)),
        }
    }

    fn value_as_string(&self, value: &ValueDescriptor) -> Result<String, TransportError> {
        match self.read(value)? {
            FakeValue::Text(v) => Ok(v),
            _ => Err(mismatch(value)),
        }
    }

    fn value_list_items(&self, value: &ValueDescriptor) -> Result<Vec<String>, TransportError> {
        match self.read(value)? {
            FakeValue::List { items, .. } => Ok(items),
            _ => Err(mismatch(value)),
        }
    }

    fn value_list_selection(&self, value: &ValueDescriptor) -> Result<String, TransportError> {
        match self.read(value)? {
            FakeValue::List { selected, .. } => Ok(selected),
            _ => Err(mismatch(value)),
        }
    }

    fn value_help(&self, value: &ValueDescriptor) -> String {
        format!("help for {}", value.id)
    }

    fn write_value(
        &self,
        home_id: u32,
        value_id: u64,
        write: ValueWrite,
    ) -> Result<(), TransportError> {
        self.command("write_value", Call::WriteValue(home_id, value_id, write.clone()))?;
        let mut state = self.state.lock();
        match (state.values.get_mut(&value_id), write) {
            (Some(FakeValue::List { selected, .. }), ValueWrite::ListSelection(label)) => {
                *selected = label;
            }
            (Some(FakeValue::Bool(v)), ValueWrite::Bool(new)) => *v = new,
            (Some(FakeValue::Byte(v)), ValueWrite::Byte(new)) => *v = new,
            _ => {}
        }
        Ok(())
    }
}

/// Factory handing out a shared [`FakeTransport`].
#[derive(Debug)]
pub struct FakeFactory {
    transport: Arc<FakeTransport>,
    watcher: Mutex<Option<NotificationWatcher>>,
    options: Mutex<Option<SessionOptions>>,
    created: AtomicUsize,
    fail: Mutex<bool>,
}

impl FakeFactory {
    pub fn new(transport: FakeTransport) -> Self {
        Self {
            transport: Arc::new(transport),
            watcher: Mutex::new(None),
            options: Mutex::new(None),
            created: AtomicUsize::new(0),
            fail: Mutex::new(false),
        }
    }

    pub fn transport(&self) -> &FakeTransport {
        &self.transport
    }

    /// Number of engines created so far.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Number of live engine handles other than the factory's own.
    pub fn live_handles(&self) -> usize {
        Arc::strong_count(&self.transport).saturating_sub(1)
    }

    pub fn last_options(&self) -> Option<SessionOptions> {
        self.options.lock().clone()
    }

    pub fn fail_creation(&self) {
        *self.fail.lock() = true;
    }

    /// Plays the engine callback thread.
    pub fn notify(&self, notification: Notification) {
        let watcher = self.watcher.lock().clone();
        if let Some(watcher) = watcher {
            watcher.notify(notification);
        }
    }
}

impl TransportFactory for FakeFactory {
    fn create(
        &self,
        options: &SessionOptions,
        watcher: NotificationWatcher,
    ) -> Result<Arc<dyn Transport>, TransportError> {
        if *self.fail.lock() {
            return Err(TransportError::Exception("engine unavailable".to_string()));
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        *self.watcher.lock() = Some(watcher);
        *self.options.lock() = Some(options.clone());
        let transport: Arc<dyn Transport> = Arc::clone(&self.transport) as Arc<dyn Transport>;
        Ok(transport)
    }
}
