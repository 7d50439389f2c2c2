//! Connection registry
//!
//! Principal-keyed map of live connections behind a single mutex. Every
//! operation is O(1) or a snapshot copy, and the lock is never held across
//! an await or a transport call.

use super::{Connection, ConnectionState};
use crate::protocol::CloseCode;
use parking_lot::Mutex;
use relay_core::PrincipalId;
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of live connections, at most one per principal
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<PrincipalId, Arc<Connection>>>,
}

impl ConnectionRegistry {
    /// Create a new connection registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new connection registry wrapped in Arc
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a connection under its principal, last writer wins.
    ///
    /// Returns the displaced entry, if any. Its transport is left open; the
    /// caller decides whether to close it.
    pub fn add(&self, connection: Arc<Connection>) -> Option<Arc<Connection>> {
        let principal = connection.principal().clone();
        let displaced = self
            .connections
            .lock()
            .insert(principal.clone(), connection);

        tracing::debug!(
            principal_id = %principal,
            replaced = displaced.is_some(),
            "Connection registered"
        );

        displaced
    }

    /// Register a connection only if no live entry exists for its principal.
    ///
    /// An entry that is already closing does not count as live and is
    /// replaced. On conflict the live entry is returned.
    pub fn try_add(&self, connection: Arc<Connection>) -> Result<(), Arc<Connection>> {
        let mut connections = self.connections.lock();

        if let Some(existing) = connections.get(connection.principal()) {
            if matches!(
                existing.state(),
                ConnectionState::Connecting | ConnectionState::Active
            ) {
                return Err(existing.clone());
            }
        }

        connections.insert(connection.principal().clone(), connection);
        Ok(())
    }

    /// Remove whatever entry is registered for a principal
    pub fn remove(&self, principal: &str) -> Option<Arc<Connection>> {
        let removed = self.connections.lock().remove(principal);
        if removed.is_some() {
            tracing::debug!(principal_id = %principal, "Connection removed");
        }
        removed
    }

    /// Remove the entry only if it is this exact connection.
    ///
    /// Teardown uses this so an evicted connection cannot unregister the
    /// connection that replaced it.
    pub fn remove_connection(&self, connection: &Arc<Connection>) -> bool {
        let mut connections = self.connections.lock();

        match connections.get(connection.principal()) {
            Some(current) if Arc::ptr_eq(current, connection) => {
                connections.remove(connection.principal());
                tracing::debug!(
                    principal_id = %connection.principal(),
                    session_id = %connection.session_id(),
                    "Connection removed"
                );
                true
            }
            _ => false,
        }
    }

    /// Get the connection registered for a principal
    pub fn get(&self, principal: &str) -> Option<Arc<Connection>> {
        self.connections.lock().get(principal).cloned()
    }

    pub fn contains(&self, principal: &str) -> bool {
        self.connections.lock().contains_key(principal)
    }

    /// Snapshot of all registered connections
    pub fn all(&self) -> Vec<Arc<Connection>> {
        self.connections.lock().values().cloned().collect()
    }

    /// Snapshot of all online principals
    pub fn ids(&self) -> Vec<PrincipalId> {
        self.connections.lock().keys().cloned().collect()
    }

    /// Close every registered transport and clear the registry.
    ///
    /// Individual close failures are logged and do not stop the sweep.
    pub fn close_all(&self, code: CloseCode) -> usize {
        let drained: Vec<Arc<Connection>> = {
            let mut connections = self.connections.lock();
            connections.drain().map(|(_, conn)| conn).collect()
        };

        for connection in &drained {
            if let Err(e) = connection.close(code) {
                tracing::warn!(
                    principal_id = %connection.principal(),
                    error = %e,
                    "Failed to close connection"
                );
            }
        }

        tracing::info!(count = drained.len(), "Closed all connections");

        drained.len()
    }

    pub fn len(&self) -> usize {
        self.connections.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.lock().is_empty()
    }
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("connections", &self.len())
            .finish()
    }
}
