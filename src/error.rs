//! Gateway error types with numeric code mapping.
//!
//! [`GatewayError`] is the central error type for the gateway. Every reply
//! object and every fallible operation resolves to one of its variants.
//! [`TransportError`] is the exception-like failure raised by the transport
//! engine; it is always caught at the call site and converted into
//! [`GatewayError::BackendError`].

use crate::domain::NetworkId;

/// Failure raised by the transport engine for a rejected or failed call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The engine refused the call (it returned `false`).
    #[error("transport rejected {0}")]
    Rejected(&'static str),

    /// The engine threw while executing the call.
    #[error("transport exception: {0}")]
    Exception(String),
}

/// A notification that could not be correlated with local state.
///
/// These are logged and dropped by the router, never surfaced to callers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// Driver-ready arrived while no network setup was pending.
    #[error("driver ready for home id {0:#010x} but no network setup is pending")]
    UnexpectedReady(u32),

    /// Driver-failed arrived while no network setup was pending.
    #[error("driver failed but no network setup is pending")]
    UnexpectedFailure,

    /// Driver-failed named an address that no pending setup uses.
    #[error("driver failed for unknown address {0}")]
    UnknownAddress(String),

    /// A notification referenced a home id with no registered network.
    #[error("unknown home id {0:#010x}")]
    UnknownHandle(u32),
}

/// Server-side error enum with numeric code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category   |
/// |-----------|------------|
/// | 1000–1999 | Validation |
/// | 2000–2999 | State      |
/// | 3000–3999 | Backend    |
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GatewayError {
    /// No network is registered under the given application id, or the
    /// network has no transport handle yet.
    #[error("network not found: {0}")]
    NetworkNotFound(NetworkId),

    /// A controller command is already outstanding on the network.
    #[error("a controller command is already in progress on network {0}")]
    CommandInUse(NetworkId),

    /// The network is already configured or its setup is still pending.
    #[error("network {0} is already configured")]
    AlreadyConfiguring(NetworkId),

    /// The transport session is active with a different configuration.
    #[error("transport session already configured: {0}")]
    ConfigurationConflict(String),

    /// The network key is not 16 hex-encoded bytes.
    #[error("invalid network key: {0}")]
    InvalidNetworkKey(String),

    /// Enumerated value selection index is out of range.
    #[error("selection {selection} out of range for {len} list items")]
    InvalidSelection {
        /// Requested selection index.
        selection: i32,
        /// Number of items in the list.
        len: usize,
    },

    /// The value cannot be written (unsupported type or mismatched payload).
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// The outstanding controller command was cancelled.
    #[error("controller command cancelled")]
    Cancelled,

    /// The transport rejected a call, threw, or reported a command failure.
    #[error("backend error: {0}")]
    BackendError(String),
}

impl GatewayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidSelection { .. } => 1001,
            Self::InvalidValue(_) => 1002,
            Self::InvalidNetworkKey(_) => 1003,
            Self::NetworkNotFound(_) => 2001,
            Self::CommandInUse(_) => 2002,
            Self::AlreadyConfiguring(_) => 2003,
            Self::ConfigurationConflict(_) => 2004,
            Self::Cancelled => 2005,
            Self::BackendError(_) => 3001,
        }
    }
}

impl From<TransportError> for GatewayError {
    fn from(err: TransportError) -> Self {
        Self::BackendError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_becomes_backend_error() {
        let err: GatewayError = TransportError::Rejected("add_node").into();
        assert_eq!(err.error_code(), 3001);
        assert!(err.to_string().contains("add_node"));
    }

    #[test]
    fn protocol_error_names_the_handle() {
        let err = ProtocolError::UnknownHandle(7);
        assert!(err.to_string().contains("0x00000007"));
    }

    #[test]
    fn codes_follow_category_ranges() {
        let id = NetworkId::new();
        assert_eq!(GatewayError::InvalidSelection { selection: 3, len: 2 }.error_code(), 1001);
        assert_eq!(GatewayError::CommandInUse(id).error_code(), 2002);
        assert_eq!(GatewayError::Cancelled.error_code(), 2005);
    }
}
