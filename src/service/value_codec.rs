//! Conversion between transport values and [`DomainValue`]s.
//!
//! Stateless. Every engine read or write that can throw is caught here and
//! turned into a [`GatewayError::BackendError`]; nothing propagates into the
//! notification router as a panic or an unhandled transport error.

use crate::domain::{DomainValue, ValueDescriptor, ValuePayload, ValueType};
use crate::error::{GatewayError, TransportError};
use crate::transport::{Transport, ValueWrite};

/// Reads the value addressed by `descriptor` into a self-contained
/// [`DomainValue`].
///
/// For lists, the engine's selected label is resolved into an index into
/// the returned items; a label missing from the list gives `-1`. Types the
/// gateway does not decode (schedule, raw, bit set) produce a value with no
/// payload.
///
/// # Errors
///
/// Returns [`GatewayError::BackendError`] if the engine fails the read.
pub fn decode(
    transport: &dyn Transport,
    descriptor: &ValueDescriptor,
) -> Result<DomainValue, GatewayError> {
    let payload = read_payload(transport, descriptor).map_err(|err| {
        tracing::warn!(
            value_id = descriptor.id,
            node_id = descriptor.node_id,
            error = %err,
            "failed to read value"
        );
        GatewayError::from(err)
    })?;

    Ok(DomainValue {
        id: descriptor.id,
        genre: descriptor.genre,
        command_class: descriptor.command_class,
        instance: descriptor.instance,
        index: descriptor.index,
        value_type: descriptor.value_type,
        description: transport.value_help(descriptor),
        payload,
    })
}

fn read_payload(
    transport: &dyn Transport,
    descriptor: &ValueDescriptor,
) -> Result<Option<ValuePayload>, TransportError> {
    let payload = match descriptor.value_type {
        ValueType::Bool | ValueType::Button => ValuePayload::Bool(transport.value_as_bool(descriptor)?),
        ValueType::Byte => ValuePayload::Byte(transport.value_as_byte(descriptor)?),
        ValueType::Short => ValuePayload::Short(transport.value_as_short(descriptor)?),
        ValueType::Int => ValuePayload::Int(transport.value_as_int(descriptor)?),
        ValueType::Decimal => ValuePayload::Decimal(transport.value_as_float(descriptor)?),
        ValueType::String => ValuePayload::String(transport.value_as_string(descriptor)?),
        ValueType::List => {
            let items = transport.value_list_items(descriptor)?;
            let selected = transport.value_list_selection(descriptor)?;
            let selection = selection_index(&items, &selected);
            ValuePayload::List { items, selection }
        }
        ValueType::Schedule | ValueType::Raw | ValueType::BitSet => {
            tracing::error!(
                value_id = descriptor.id,
                value_type = ?descriptor.value_type,
                "unhandled value type"
            );
            return Ok(None);
        }
    };
    Ok(Some(payload))
}

/// Position of `selected` in `items`, or `-1`.
fn selection_index(items: &[String], selected: &str) -> i32 {
    items
        .iter()
        .position(|item| item == selected)
        .and_then(|i| i32::try_from(i).ok())
        .unwrap_or(-1)
}

/// Translates a [`DomainValue`] into the engine write it stands for.
///
/// Pure: never contacts the engine.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidSelection`] for a list selection outside
/// the item range, and [`GatewayError::InvalidValue`] for unsupported types
/// or a payload that does not match the value type.
pub fn write_for(value: &DomainValue) -> Result<ValueWrite, GatewayError> {
    let Some(payload) = &value.payload else {
        return Err(GatewayError::InvalidValue(format!(
            "value {} has no payload",
            value.id
        )));
    };

    match (value.value_type, payload) {
        (ValueType::Bool, ValuePayload::Bool(v)) => Ok(ValueWrite::Bool(*v)),
        (ValueType::Button, ValuePayload::Bool(true)) => Ok(ValueWrite::PressButton),
        (ValueType::Button, ValuePayload::Bool(false)) => Ok(ValueWrite::ReleaseButton),
        (ValueType::Byte, ValuePayload::Byte(v)) => Ok(ValueWrite::Byte(*v)),
        (ValueType::Short, ValuePayload::Short(v)) => Ok(ValueWrite::Short(*v)),
        (ValueType::Int, ValuePayload::Int(v)) => Ok(ValueWrite::Int(*v)),
        (ValueType::Decimal, ValuePayload::Decimal(v)) => Ok(ValueWrite::Float(*v)),
        (ValueType::String, ValuePayload::String(v)) => Ok(ValueWrite::String(v.clone())),
        (ValueType::List, ValuePayload::List { items, selection }) => usize::try_from(*selection)
            .ok()
            .and_then(|i| items.get(i))
            .map(|label| ValueWrite::ListSelection(label.clone()))
            .ok_or(GatewayError::InvalidSelection {
                selection: *selection,
                len: items.len(),
            }),
        (ValueType::Schedule | ValueType::Raw | ValueType::BitSet, _) => Err(
            GatewayError::InvalidValue(format!("writing {:?} values is not supported", value.value_type)),
        ),
        (value_type, _) => Err(GatewayError::InvalidValue(format!(
            "payload does not match value type {value_type:?}"
        ))),
    }
}

/// Writes `value` to the engine on network `home_id`.
///
/// # Errors
///
/// Returns the local validation errors of [`write_for`] without contacting
/// the engine, or [`GatewayError::BackendError`] if the engine rejects or
/// throws on the write.
pub fn encode(
    transport: &dyn Transport,
    home_id: u32,
    value: &DomainValue,
) -> Result<(), GatewayError> {
    let write = write_for(value)?;
    transport
        .write_value(home_id, value.id, write)
        .map_err(|err| {
            tracing::warn!(home_id, value_id = value.id, error = %err, "error setting value");
            GatewayError::from(err)
        })
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{CommandClass, ValueGenre};
    use crate::test_support::{Call, FakeTransport, FakeValue};

    fn descriptor(id: u64, value_type: ValueType) -> ValueDescriptor {
        ValueDescriptor {
            home_id: 7,
            node_id: 3,
            id,
            genre: ValueGenre::User,
            command_class: CommandClass::SWITCH_BINARY,
            instance: 1,
            index: 0,
            value_type,
        }
    }

    fn list_transport(selected: &str) -> FakeTransport {
        let transport = FakeTransport::modern();
        transport.set_value(
            10,
            FakeValue::List {
                items: vec!["Off".into(), "On".into()],
                selected: selected.into(),
            },
        );
        transport
    }

    #[test]
    fn decodes_bool_with_description() {
        let transport = FakeTransport::modern();
        transport.set_value(1, FakeValue::Bool(true));

        let Ok(value) = decode(&transport, &descriptor(1, ValueType::Bool)) else {
            panic!("decode failed");
        };
        assert_eq!(value.payload, Some(ValuePayload::Bool(true)));
        assert_eq!(value.description, "help for 1");
        assert_eq!(value.command_class, CommandClass::SWITCH_BINARY);
        assert!(value.value_type.matches(&ValuePayload::Bool(true)));
    }

    #[test]
    fn decodes_numeric_and_text_payloads() {
        let transport = FakeTransport::modern();
        transport.set_value(2, FakeValue::Short(-300));
        transport.set_value(3, FakeValue::Int(70_000));
        transport.set_value(4, FakeValue::Float(21.5));
        transport.set_value(5, FakeValue::Text("kitchen".into()));

        let cases = [
            (2, ValueType::Short, ValuePayload::Short(-300)),
            (3, ValueType::Int, ValuePayload::Int(70_000)),
            (4, ValueType::Decimal, ValuePayload::Decimal(21.5)),
            (5, ValueType::String, ValuePayload::String("kitchen".into())),
        ];
        for (id, value_type, expected) in cases {
            let Ok(value) = decode(&transport, &descriptor(id, value_type)) else {
                panic!("decode of {value_type:?} failed");
            };
            assert_eq!(value.payload, Some(expected));
        }

        // Stored type and declared type disagree.
        assert!(matches!(
            decode(&transport, &descriptor(5, ValueType::Int)),
            Err(GatewayError::BackendError(_))
        ));
    }

    #[test]
    fn list_selection_resolves_to_index() {
        let transport = list_transport("On");
        let Ok(value) = decode(&transport, &descriptor(10, ValueType::List)) else {
            panic!("decode failed");
        };
        assert_eq!(value.selection(), Some(1));
    }

    #[test]
    fn unknown_list_selection_is_minus_one() {
        let transport = list_transport("Standby");
        let Ok(value) = decode(&transport, &descriptor(10, ValueType::List)) else {
            panic!("unknown selection must not be an error");
        };
        assert_eq!(value.selection(), Some(-1));
    }

    #[test]
    fn throwing_read_becomes_backend_error() {
        let transport = FakeTransport::modern();
        transport.throw_on(5);
        assert!(matches!(
            decode(&transport, &descriptor(5, ValueType::Int)),
            Err(GatewayError::BackendError(_))
        ));
    }

    #[test]
    fn unsupported_type_has_no_payload() {
        let transport = FakeTransport::modern();
        let Ok(value) = decode(&transport, &descriptor(6, ValueType::Schedule)) else {
            panic!("decode failed");
        };
        assert!(value.payload.is_none());
    }

    #[test]
    fn out_of_range_selection_never_reaches_engine() {
        let transport = list_transport("Off");
        let Ok(value) = decode(&transport, &descriptor(10, ValueType::List)) else {
            panic!("decode failed");
        };
        let bad = value.with_payload(ValuePayload::List {
            items: vec!["Off".into(), "On".into()],
            selection: 2,
        });

        assert_eq!(
            encode(&transport, 7, &bad),
            Err(GatewayError::InvalidSelection {
                selection: 2,
                len: 2
            })
        );
        assert!(transport.calls().is_empty());
    }

    #[test]
    fn selection_survives_encode_then_decode() {
        let transport = list_transport("Off");
        let desc = descriptor(10, ValueType::List);
        let Ok(value) = decode(&transport, &desc) else {
            panic!("decode failed");
        };
        let wanted = value.with_payload(ValuePayload::List {
            items: vec!["Off".into(), "On".into()],
            selection: 1,
        });

        assert_eq!(encode(&transport, 7, &wanted), Ok(()));
        let Ok(reread) = decode(&transport, &desc) else {
            panic!("decode failed");
        };
        assert_eq!(reread.selection(), Some(1));
    }

    #[test]
    fn button_maps_to_press_and_release() {
        let mut value = DomainValue {
            id: 11,
            genre: ValueGenre::User,
            command_class: CommandClass::BASIC,
            instance: 1,
            index: 0,
            value_type: ValueType::Button,
            description: String::new(),
            payload: Some(ValuePayload::Bool(true)),
        };
        assert_eq!(write_for(&value), Ok(ValueWrite::PressButton));
        value.payload = Some(ValuePayload::Bool(false));
        assert_eq!(write_for(&value), Ok(ValueWrite::ReleaseButton));
    }

    #[test]
    fn mismatched_payload_is_invalid() {
        let value = DomainValue {
            id: 12,
            genre: ValueGenre::Config,
            command_class: CommandClass::CONFIGURATION,
            instance: 1,
            index: 3,
            value_type: ValueType::Byte,
            description: String::new(),
            payload: Some(ValuePayload::Short(300)),
        };
        assert!(matches!(write_for(&value), Err(GatewayError::InvalidValue(_))));
    }

    #[test]
    fn rejected_write_is_backend_error() {
        let transport = FakeTransport::modern();
        transport.reject("write_value");
        let value = DomainValue {
            id: 1,
            genre: ValueGenre::User,
            command_class: CommandClass::SWITCH_BINARY,
            instance: 1,
            index: 0,
            value_type: ValueType::Bool,
            description: String::new(),
            payload: Some(ValuePayload::Bool(false)),
        };
        assert!(matches!(
            encode(&transport, 7, &value),
            Err(GatewayError::BackendError(_))
        ));
        assert_eq!(
            transport.calls(),
            vec![Call::WriteValue(7, 1, ValueWrite::Bool(false))]
        );
    }
}
