//! Tracing subscriber setup for host processes.

use tracing_subscriber::EnvFilter;

use crate::config::GatewayConfig;

/// Builds the log filter: `RUST_LOG` if set and valid, otherwise the
/// configured default.
#[must_use]
pub fn env_filter(config: &GatewayConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter))
}

/// Installs a global `fmt` subscriber, JSON-formatted if configured.
///
/// Does nothing if a global subscriber is already installed, so hosts that
/// configure `tracing` themselves are left alone.
pub fn init_tracing(config: &GatewayConfig) {
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter(config));
    let installed = if config.log_json {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    };
    if installed {
        tracing::debug!(filter = %config.log_filter, "tracing initialized");
    }
}
