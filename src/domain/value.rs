//! Device parameter values as seen by the application.
//!
//! A [`ValueDescriptor`] is the transport's address of a value (the engine's
//! value id). A [`DomainValue`] is the decoded, self-contained snapshot the
//! gateway hands to the application.

use serde::{Deserialize, Serialize};

/// Value genre as classified by the transport engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueGenre {
    /// Basic command class value.
    Basic,
    /// Value meant for end users.
    User,
    /// Device configuration parameter.
    Config,
    /// Internal value used by the engine.
    System,
}

impl TryFrom<u8> for ValueGenre {
    type Error = u8;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(Self::Basic),
            1 => Ok(Self::User),
            2 => Ok(Self::Config),
            3 => Ok(Self::System),
            other => Err(other),
        }
    }
}

/// Storage type of a value, in the transport engine's numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    /// Boolean.
    Bool,
    /// Unsigned 8-bit.
    Byte,
    /// Floating point with device-defined precision.
    Decimal,
    /// Signed 32-bit.
    Int,
    /// Enumerated selection from a list of strings.
    List,
    /// Climate control schedule.
    Schedule,
    /// Signed 16-bit.
    Short,
    /// UTF-8 string.
    String,
    /// Write-only momentary button.
    Button,
    /// Raw bytes.
    Raw,
    /// Bit set.
    BitSet,
}

impl ValueType {
    /// Returns `true` if `payload` is the variant this type decodes to.
    #[must_use]
    pub const fn matches(self, payload: &ValuePayload) -> bool {
        matches!(
            (self, payload),
            (Self::Bool | Self::Button, ValuePayload::Bool(_))
                | (Self::Byte, ValuePayload::Byte(_))
                | (Self::Short, ValuePayload::Short(_))
                | (Self::Int, ValuePayload::Int(_))
                | (Self::Decimal, ValuePayload::Decimal(_))
                | (Self::String, ValuePayload::String(_))
                | (Self::List, ValuePayload::List { .. })
        )
    }
}

impl TryFrom<u8> for ValueType {
    type Error = u8;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(Self::Bool),
            1 => Ok(Self::Byte),
            2 => Ok(Self::Decimal),
            3 => Ok(Self::Int),
            4 => Ok(Self::List),
            5 => Ok(Self::Schedule),
            6 => Ok(Self::Short),
            7 => Ok(Self::String),
            8 => Ok(Self::Button),
            9 => Ok(Self::Raw),
            10 => Ok(Self::BitSet),
            other => Err(other),
        }
    }
}

/// Z-Wave command class id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandClass(pub u8);

impl CommandClass {
    /// `COMMAND_CLASS_BASIC`.
    pub const BASIC: Self = Self(0x20);
    /// `COMMAND_CLASS_SWITCH_BINARY`.
    pub const SWITCH_BINARY: Self = Self(0x25);
    /// `COMMAND_CLASS_SWITCH_MULTILEVEL`.
    pub const SWITCH_MULTILEVEL: Self = Self(0x26);
    /// `COMMAND_CLASS_CONFIGURATION`.
    pub const CONFIGURATION: Self = Self(0x70);
    /// `COMMAND_CLASS_SECURITY`.
    pub const SECURITY: Self = Self(0x98);
}

/// Transport address of a single value on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValueDescriptor {
    /// Transport network handle (home id).
    pub home_id: u32,
    /// Node the value lives on.
    pub node_id: u8,
    /// Engine-assigned 64-bit value id.
    pub id: u64,
    /// Value genre.
    pub genre: ValueGenre,
    /// Command class exposing the value.
    pub command_class: CommandClass,
    /// Command class instance.
    pub instance: u8,
    /// Index within the command class.
    pub index: u16,
    /// Storage type.
    pub value_type: ValueType,
}

impl ValueDescriptor {
    /// Addresses a value by its fields, packing the engine's 64-bit value id
    /// the way the engine does.
    #[must_use]
    pub fn compose(
        home_id: u32,
        node_id: u8,
        genre: ValueGenre,
        command_class: CommandClass,
        instance: u8,
        index: u16,
        value_type: ValueType,
    ) -> Self {
        let low = (u32::from(node_id) << 24)
            | (u32::from(genre as u8) << 22)
            | (u32::from(command_class.0) << 14)
            | (u32::from(instance) << 4)
            | u32::from(value_type as u8);
        let high = u32::from(index) << 16;
        Self {
            home_id,
            node_id,
            id: (u64::from(high) << 32) | u64::from(low),
            genre,
            command_class,
            instance,
            index,
            value_type,
        }
    }
}

/// Decoded value contents. The active variant always matches the owning
/// value's [`ValueType`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ValuePayload {
    /// `Bool` and `Button` values.
    Bool(bool),
    /// `Byte` values.
    Byte(u8),
    /// `Short` values.
    Short(i16),
    /// `Int` values.
    Int(i32),
    /// `Decimal` values.
    Decimal(f32),
    /// `String` values.
    String(String),
    /// `List` values: every item plus the index of the selected one, or
    /// `-1` when the engine's selection is not in the list.
    List {
        /// Selectable items in engine order.
        items: Vec<String>,
        /// Selected item index, `-1` for none.
        selection: i32,
    },
}

/// Self-contained snapshot of a value, emitted on value-added and
/// value-changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainValue {
    /// Engine-assigned 64-bit value id.
    pub id: u64,
    /// Value genre.
    pub genre: ValueGenre,
    /// Command class exposing the value.
    pub command_class: CommandClass,
    /// Command class instance.
    pub instance: u8,
    /// Index within the command class.
    pub index: u16,
    /// Storage type.
    pub value_type: ValueType,
    /// Help text reported by the engine.
    pub description: String,
    /// Current contents. `None` for types the gateway does not decode.
    pub payload: Option<ValuePayload>,
}

impl DomainValue {
    /// Returns the selected list index, or `None` if this is not a list.
    #[must_use]
    pub fn selection(&self) -> Option<i32> {
        match &self.payload {
            Some(ValuePayload::List { selection, .. }) => Some(*selection),
            _ => None,
        }
    }

    /// Returns a copy of this value with a new payload.
    #[must_use]
    pub fn with_payload(&self, payload: ValuePayload) -> Self {
        Self {
            payload: Some(payload),
            ..self.clone()
        }
    }
}
