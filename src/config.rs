//! Gateway configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). The values feed the transport session
//! options and the event bus.

use std::path::PathBuf;

/// Top-level gateway configuration.
///
/// Loaded once at startup via [`GatewayConfig::from_env`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Read-only engine configuration directory (device database).
    pub system_config_path: PathBuf,

    /// Writable engine directory for network caches.
    pub user_path: PathBuf,

    /// Seconds between engine value polls.
    pub poll_interval_secs: u64,

    /// Whether the poll interval is between polls rather than per cycle.
    pub interval_between_polls: bool,

    /// Whether the engine double-checks suspicious value changes.
    pub validate_value_changes: bool,

    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub log_filter: String,

    /// Emit logs as JSON lines instead of human-readable text.
    pub log_json: bool,

    /// Capacity of the EventBus broadcast channel.
    pub event_bus_capacity: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            system_config_path: PathBuf::from("/etc/openzwave/"),
            user_path: PathBuf::from("./openzwave/"),
            poll_interval_secs: 5,
            interval_between_polls: true,
            validate_value_changes: true,
            log_filter: "info".to_string(),
            log_json: false,
            event_bus_capacity: 10_000,
        }
    }
}

impl GatewayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to the [`Default`] values when a variable is not set or
    /// cannot be parsed. Calls `dotenvy::dotenv().ok()` to optionally load a
    /// `.env` file.
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        Self {
            system_config_path: std::env::var("ZWAVE_SYSTEM_CONFIG_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.system_config_path),
            user_path: std::env::var("ZWAVE_USER_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.user_path),
            poll_interval_secs: parse_env("ZWAVE_POLL_INTERVAL_SECS", defaults.poll_interval_secs),
            interval_between_polls: parse_env_bool(
                "ZWAVE_INTERVAL_BETWEEN_POLLS",
                defaults.interval_between_polls,
            ),
            validate_value_changes: parse_env_bool(
                "ZWAVE_VALIDATE_VALUE_CHANGES",
                defaults.validate_value_changes,
            ),
            log_filter: std::env::var("ZWAVE_LOG_FILTER").unwrap_or(defaults.log_filter),
            log_json: parse_env_bool("ZWAVE_LOG_JSON", defaults.log_json),
            event_bus_capacity: parse_env("EVENT_BUS_CAPACITY", defaults.event_bus_capacity),
        }
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parses an environment variable as a boolean. Accepts `"true"`, `"1"`,
/// `"false"`, `"0"` (case-insensitive). Returns `default` otherwise.
fn parse_env_bool(key: &str, default: bool) -> bool {
    parse_bool(std::env::var(key).ok().as_deref(), default)
}

fn parse_bool(raw: Option<&str>, default: bool) -> bool {
    match raw.map(str::to_ascii_lowercase).as_deref() {
        Some("true" | "1") => true,
        Some("false" | "0") => false,
        _ => default,
    }
}
