//! Bidirectional mapping between application network ids and transport
//! home ids.
//!
//! [`NetworkRegistry`] owns every [`NetworkIdentity`] plus the FIFO of
//! setups still waiting for a home id. It performs no locking and no
//! transport calls of its own: the backend keeps it behind the same lock as
//! the command correlator and issues the matching transport calls itself.
//!
//! # Correlation limitation
//!
//! The transport gives no token linking a driver-ready (or, on legacy
//! engines, a driver-failed) notification to the add-driver call that
//! caused it. Pending setups are therefore resolved strictly
//! first-in-first-out. Two networks started concurrently whose drivers come
//! up in the opposite order will be bound to each other's home ids.

use std::collections::{HashMap, VecDeque};

use super::NetworkId;
use crate::error::{GatewayError, ProtocolError};

/// A configured network: the application id, the transport address it was
/// started on, and its home id once the driver reported ready.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkIdentity {
    /// Application network id.
    pub network_id: NetworkId,
    /// Transport home id, `None` while setup is pending.
    pub home_id: Option<u32>,
    /// Transport address, e.g. a serial port path.
    pub address: String,
}

/// Central store for all configured networks.
#[derive(Debug, Default)]
pub struct NetworkRegistry {
    identities: HashMap<NetworkId, NetworkIdentity>,
    handles: HashMap<u32, NetworkId>,
    pending: VecDeque<NetworkId>,
}

impl NetworkRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a new pending setup at the tail of the FIFO.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::AlreadyConfiguring`] if the id is already
    /// configured or pending.
    pub fn begin_setup(
        &mut self,
        network_id: NetworkId,
        address: &str,
    ) -> Result<(), GatewayError> {
        if self.identities.contains_key(&network_id) {
            return Err(GatewayError::AlreadyConfiguring(network_id));
        }
        self.identities.insert(
            network_id,
            NetworkIdentity {
                network_id,
                home_id: None,
                address: address.to_string(),
            },
        );
        self.pending.push_back(network_id);
        Ok(())
    }

    /// Binds the head of the pending FIFO to `home_id`.
    ///
    /// If another identity still holds `home_id`, it loses the binding so a
    /// home id never maps to two networks.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::UnexpectedReady`] if nothing is pending.
    pub fn resolve_ready(&mut self, home_id: u32) -> Result<NetworkId, ProtocolError> {
        let network_id = self
            .pending
            .pop_front()
            .ok_or(ProtocolError::UnexpectedReady(home_id))?;

        if let Some(previous) = self.handles.insert(home_id, network_id)
            && previous != network_id
        {
            tracing::warn!(home_id, %previous, "home id rebound to a different network");
            if let Some(identity) = self.identities.get_mut(&previous) {
                identity.home_id = None;
            }
        }
        if let Some(identity) = self.identities.get_mut(&network_id) {
            identity.home_id = Some(home_id);
        }
        Ok(network_id)
    }

    /// Fails a pending setup and destroys its identity.
    ///
    /// With an address (modern engines) the pending setup started on that
    /// address is matched directly. Without one (legacy engines and the
    /// add-driver timeout) the head of the FIFO is taken.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::UnexpectedFailure`] if nothing is pending, or
    /// [`ProtocolError::UnknownAddress`] if no pending setup uses `address`.
    pub fn resolve_failed(
        &mut self,
        address: Option<&str>,
    ) -> Result<NetworkIdentity, ProtocolError> {
        if self.pending.is_empty() {
            return Err(ProtocolError::UnexpectedFailure);
        }

        let position = match address {
            None => 0,
            Some(address) => self
                .pending
                .iter()
                .position(|id| {
                    self.identities
                        .get(id)
                        .is_some_and(|identity| identity.address == address)
                })
                .ok_or_else(|| ProtocolError::UnknownAddress(address.to_string()))?,
        };

        let network_id = self
            .pending
            .remove(position)
            .ok_or(ProtocolError::UnexpectedFailure)?;
        self.identities
            .remove(&network_id)
            .ok_or(ProtocolError::UnexpectedFailure)
    }

    /// Moves a configured network back to pending, returning its old home id.
    ///
    /// Used by controller factory reset: the engine reports a fresh
    /// driver-ready afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NetworkNotFound`] if the network has no home id.
    pub fn begin_reset(&mut self, network_id: NetworkId) -> Result<u32, GatewayError> {
        let identity = self
            .identities
            .get_mut(&network_id)
            .ok_or(GatewayError::NetworkNotFound(network_id))?;
        let home_id = identity
            .home_id
            .take()
            .ok_or(GatewayError::NetworkNotFound(network_id))?;
        self.handles.remove(&home_id);
        self.pending.push_back(network_id);
        Ok(home_id)
    }

    /// Returns the home id bound to `network_id`.
    #[must_use]
    pub fn lookup(&self, network_id: NetworkId) -> Option<u32> {
        self.identities.get(&network_id).and_then(|i| i.home_id)
    }

    /// Returns the network bound to `home_id`.
    #[must_use]
    pub fn reverse_lookup(&self, home_id: u32) -> Option<NetworkId> {
        self.handles.get(&home_id).copied()
    }

    /// Returns the identity recorded for `network_id`.
    #[must_use]
    pub fn identity(&self, network_id: NetworkId) -> Option<&NetworkIdentity> {
        self.identities.get(&network_id)
    }

    /// Removes a network, pending or configured.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NetworkNotFound`] if the id is unknown.
    pub fn remove(&mut self, network_id: NetworkId) -> Result<NetworkIdentity, GatewayError> {
        let identity = self
            .identities
            .remove(&network_id)
            .ok_or(GatewayError::NetworkNotFound(network_id))?;
        if let Some(home_id) = identity.home_id {
            self.handles.remove(&home_id);
        }
        self.pending.retain(|id| *id != network_id);
        Ok(identity)
    }

    /// Returns `true` if any setup is waiting for a home id.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Returns the number of networks, pending or configured.
    #[must_use]
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    /// Returns `true` if no network is configured or pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn started(registry: &mut NetworkRegistry, address: &str) -> NetworkId {
        let id = NetworkId::new();
        let Ok(()) = registry.begin_setup(id, address) else {
            panic!("setup rejected");
        };
        id
    }

    #[test]
    fn ready_binds_head_of_queue() {
        let mut registry = NetworkRegistry::new();
        let a = started(&mut registry, "/dev/ttyX");

        assert_eq!(registry.lookup(a), None);
        assert_eq!(registry.resolve_ready(7), Ok(a));
        assert_eq!(registry.lookup(a), Some(7));
        assert_eq!(registry.reverse_lookup(7), Some(a));
        assert!(!registry.has_pending());
    }

    #[test]
    fn duplicate_setup_is_rejected() {
        let mut registry = NetworkRegistry::new();
        let a = started(&mut registry, "/dev/ttyX");
        assert_eq!(
            registry.begin_setup(a, "/dev/ttyY"),
            Err(GatewayError::AlreadyConfiguring(a))
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unexpected_ready_is_protocol_error() {
        let mut registry = NetworkRegistry::new();
        assert_eq!(
            registry.resolve_ready(9),
            Err(ProtocolError::UnexpectedReady(9))
        );
    }

    #[test]
    fn failure_by_address_skips_queue_order() {
        let mut registry = NetworkRegistry::new();
        let a = started(&mut registry, "/dev/ttyA");
        let b = started(&mut registry, "/dev/ttyB");

        let Ok(failed) = registry.resolve_failed(Some("/dev/ttyB")) else {
            panic!("expected match");
        };
        assert_eq!(failed.network_id, b);
        assert_eq!(registry.resolve_ready(3), Ok(a));
        assert!(registry.identity(b).is_none());
    }

    #[test]
    fn failure_with_unknown_address() {
        let mut registry = NetworkRegistry::new();
        let _ = started(&mut registry, "/dev/ttyA");
        assert_eq!(
            registry.resolve_failed(Some("/dev/ttyZ")),
            Err(ProtocolError::UnknownAddress("/dev/ttyZ".into()))
        );
        assert!(registry.has_pending());
    }

    #[test]
    fn failure_without_pending() {
        let mut registry = NetworkRegistry::new();
        assert_eq!(
            registry.resolve_failed(None),
            Err(ProtocolError::UnexpectedFailure)
        );
    }

    #[test]
    fn reset_requeues_network() {
        let mut registry = NetworkRegistry::new();
        let a = started(&mut registry, "/dev/ttyA");
        let _ = registry.resolve_ready(7);

        assert_eq!(registry.begin_reset(a), Ok(7));
        assert_eq!(registry.reverse_lookup(7), None);
        assert!(registry.has_pending());
        assert_eq!(registry.resolve_ready(8), Ok(a));
        assert_eq!(registry.lookup(a), Some(8));
    }

    #[test]
    fn reset_requires_handle() {
        let mut registry = NetworkRegistry::new();
        let a = started(&mut registry, "/dev/ttyA");
        assert_eq!(registry.begin_reset(a), Err(GatewayError::NetworkNotFound(a)));
    }

    #[test]
    fn rebinding_a_handle_unbinds_the_previous_owner() {
        let mut registry = NetworkRegistry::new();
        let a = started(&mut registry, "/dev/ttyA");
        let _ = registry.resolve_ready(7);
        let b = started(&mut registry, "/dev/ttyB");
        let _ = registry.resolve_ready(7);

        assert_eq!(registry.reverse_lookup(7), Some(b));
        assert_eq!(registry.lookup(a), None);
    }

    #[test]
    fn remove_clears_both_directions() {
        let mut registry = NetworkRegistry::new();
        let a = started(&mut registry, "/dev/ttyA");
        let _ = registry.resolve_ready(7);

        let Ok(identity) = registry.remove(a) else {
            panic!("expected removal");
        };
        assert_eq!(identity.address, "/dev/ttyA");
        assert_eq!(registry.reverse_lookup(7), None);
        assert!(registry.is_empty());
        assert!(registry.remove(a).is_err());
    }

    proptest! {
        #[test]
        fn ready_callbacks_resolve_in_setup_order(count in 1usize..12) {
            let mut registry = NetworkRegistry::new();
            let ids: Vec<NetworkId> = (0..count)
                .map(|i| started(&mut registry, &format!("/dev/tty{i}")))
                .collect();

            for (handle, id) in (100u32..).zip(&ids) {
                prop_assert_eq!(registry.resolve_ready(handle), Ok(*id));
            }
            for (handle, id) in (100u32..).zip(&ids) {
                prop_assert_eq!(registry.lookup(*id), Some(handle));
                prop_assert_eq!(registry.reverse_lookup(handle), Some(*id));
            }
        }

        #[test]
        fn anonymous_failures_resolve_in_setup_order(count in 1usize..12) {
            let mut registry = NetworkRegistry::new();
            let ids: Vec<NetworkId> = (0..count)
                .map(|i| started(&mut registry, &format!("/dev/tty{i}")))
                .collect();

            for id in &ids {
                let failed = registry.resolve_failed(None).map(|i| i.network_id);
                prop_assert_eq!(failed, Ok(*id));
            }
            prop_assert!(registry.is_empty());
        }
    }
}
