//! Domain layer: identifiers, values, the network registry, replies and the
//! event system.
//!
//! This module contains everything the gateway keeps or hands out that does
//! not depend on the transport engine's own types: application network ids,
//! decoded values, node attributes, the registry mapping networks to home
//! ids, reply objects, and the event bus broadcasting domain events.

pub mod envelope;
pub mod event_bus;
pub mod link_quality;
pub mod network_id;
pub mod network_registry;
pub mod node;
pub mod reply;
pub mod value;
pub mod zwave_event;

pub use envelope::{EventEnvelope, NetworkFilter};
pub use event_bus::EventBus;
pub use network_id::NetworkId;
pub use network_registry::{NetworkIdentity, NetworkRegistry};
pub use node::{NodeBasicType, NodeRef, NodeRole};
pub use reply::{CommandReply, ReplyResult};
pub use value::{CommandClass, DomainValue, ValueDescriptor, ValueGenre, ValuePayload, ValueType};
pub use zwave_event::ZWaveEvent;
