//! Transport engine session lifecycle.
//!
//! The engine is process-wide: one configuration, one instance. A
//! [`TransportSession`] is opened when the first network starts and dropped
//! when the last one stops. Its configuration cannot change while it is
//! alive; a start request with a different network key is rejected.

use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use super::{NotificationWatcher, ProtocolVariant, Transport, TransportFactory};
use crate::config::GatewayConfig;
use crate::error::GatewayError;

/// Options the engine is created with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Read-only device database directory.
    pub system_config_path: PathBuf,
    /// Writable cache directory.
    pub user_path: PathBuf,
    /// Seconds between value polls.
    pub poll_interval_secs: u64,
    /// Whether the interval is between polls.
    pub interval_between_polls: bool,
    /// Whether suspicious value changes are re-validated.
    pub validate_value_changes: bool,
    /// Engine-internal file logging. The gateway logs through `tracing`.
    pub engine_logging: bool,
    /// Engine console output.
    pub console_output: bool,
    /// Network key in engine format (`"0x01, 0x02, ..."`), if any.
    pub network_key: Option<String>,
}

impl SessionOptions {
    /// Builds session options from the gateway configuration and an
    /// optional hex network key.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidNetworkKey`] if the key is not 32 hex
    /// characters.
    pub fn from_config(
        config: &GatewayConfig,
        network_key: Option<&str>,
    ) -> Result<Self, GatewayError> {
        Ok(Self {
            system_config_path: config.system_config_path.clone(),
            user_path: config.user_path.clone(),
            poll_interval_secs: config.poll_interval_secs,
            interval_between_polls: config.interval_between_polls,
            validate_value_changes: config.validate_value_changes,
            engine_logging: false,
            console_output: false,
            network_key: network_key.map(format_network_key).transpose()?,
        })
    }
}

/// Renders a 16-byte hex key as the engine expects it:
/// `"0x01, 0x02, ..., 0x10"`.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidNetworkKey`] if `hex` is not exactly 32
/// hex digits.
pub fn format_network_key(hex: &str) -> Result<String, GatewayError> {
    let hex = hex.trim();
    if hex.len() != 32 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(GatewayError::InvalidNetworkKey(format!(
            "expected 32 hex digits, got {hex:?}"
        )));
    }

    let mut formatted = String::with_capacity(16 * 6);
    for (i, pair) in hex.as_bytes().chunks(2).enumerate() {
        if i > 0 {
            formatted.push_str(", ");
        }
        let digits = String::from_utf8_lossy(pair).to_ascii_uppercase();
        let _ = write!(formatted, "0x{digits}");
    }
    Ok(formatted)
}

/// A live transport engine plus the configuration it was created with.
#[derive(Debug)]
pub struct TransportSession {
    transport: Arc<dyn Transport>,
    variant: ProtocolVariant,
    options: SessionOptions,
}

impl TransportSession {
    /// Creates the engine and registers the notification watcher.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::BackendError`] if the factory fails.
    pub fn open(
        factory: &dyn TransportFactory,
        options: SessionOptions,
        watcher: NotificationWatcher,
    ) -> Result<Self, GatewayError> {
        let transport = factory.create(&options, watcher)?;
        let variant = transport.protocol_variant();
        tracing::info!(
            ?variant,
            system_config = %options.system_config_path.display(),
            user_path = %options.user_path.display(),
            "transport session opened"
        );
        Ok(Self {
            transport,
            variant,
            options,
        })
    }

    /// Checks that a network started with `network_key` can join this
    /// session.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::ConfigurationConflict`] if a key is given
    /// and differs from the session's key, or
    /// [`GatewayError::InvalidNetworkKey`] if it is malformed.
    pub fn check_compatible(&self, network_key: Option<&str>) -> Result<(), GatewayError> {
        let Some(key) = network_key else {
            return Ok(());
        };
        let requested = format_network_key(key)?;
        if self.options.network_key.as_deref() == Some(requested.as_str()) {
            return Ok(());
        }
        Err(GatewayError::ConfigurationConflict(
            "the transport engine supports a single network key per session".to_string(),
        ))
    }

    /// The engine.
    #[must_use]
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Contract variant resolved at session start.
    #[must_use]
    pub const fn variant(&self) -> ProtocolVariant {
        self.variant
    }

    /// Options the session was created with.
    #[must_use]
    pub const fn options(&self) -> &SessionOptions {
        &self.options
    }
}
