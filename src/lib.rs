//! # zwave-gateway
//!
//! Correlation layer between a Z-Wave transport engine and a consuming
//! application.
//!
//! The engine reports everything through one serial stream of notifications
//! keyed by numeric home ids and node ids, with no token tying progress back
//! to the call that caused it. This crate maps stable application network
//! ids onto home ids, keeps at most one controller command outstanding per
//! network and resolves its reply exactly once, and classifies raw
//! notifications into a small set of domain events.
//!
//! ## Architecture
//!
//! ```text
//! Application
//!     │  start/stop, queries, set_value, add/remove node → CommandReply
//!     ▼
//! ZWaveBackend (service/)  ◀── Notification ── engine callback thread
//!     │
//!     ├── NetworkRegistry (domain/)    ┐
//!     ├── CommandCorrelator (service/) ├─ one parking_lot::Mutex
//!     ├── TransportSession (transport/)┘
//!     │
//!     ├── NotificationRouter + value codec (service/)
//!     │
//!     └── EventBus (domain/) ── ZWaveEvent ──▶ subscribers
//! ```
//!
//! The host process implements [`transport::Transport`] and
//! [`transport::TransportFactory`] over its engine binding.

pub mod config;
pub mod domain;
pub mod error;
pub mod service;
pub mod telemetry;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use config::GatewayConfig;
pub use domain::{EventBus, NetworkId, ZWaveEvent};
pub use error::GatewayError;
pub use service::ZWaveBackend;
