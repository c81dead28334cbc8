//! Service layer: correlation, routing and the gateway facade.
//!
//! [`ZWaveBackend`] coordinates network lifecycle and controller commands,
//! routes engine notifications through the [`notification_router`], and
//! emits events through the [`super::domain::EventBus`].

pub mod backend;
pub mod command_correlator;
pub mod notification_router;
pub mod value_codec;

pub use backend::ZWaveBackend;
pub use command_correlator::{CommandCorrelator, CommandKind};
