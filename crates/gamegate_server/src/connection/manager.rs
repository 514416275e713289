//! Connection manager for tracking and managing client connections.
//!
//! This module provides the central registry of live connections, handling
//! connection lifecycle, user id assignment, and server-initiated disconnects.

use super::{client::ClientConnection, ConnectionId};
use crate::error::ServerError;
use crate::session::ShutdownSignal;
use gamegate_jobs::UserId;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Central manager for all client connections.
///
/// # Architecture
///
/// * Uses `RwLock<HashMap>` for thread-safe connection storage
/// * Implements atomic connection ID generation
/// * Holds each session's shutdown signal so connections can be kicked
#[derive(Debug)]
pub struct ConnectionManager {
    /// Map of connection ID to client connection information
    connections: Arc<RwLock<HashMap<ConnectionId, ClientConnection>>>,

    /// Atomic counter for generating unique connection IDs
    next_id: Arc<AtomicUsize>,
}

impl ConnectionManager {
    /// Creates an empty connection manager.
    pub fn new() -> Self {
        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicUsize::new(1)),
        }
    }

    /// Adds a new connection and returns its unique ID.
    ///
    /// # Arguments
    ///
    /// * `remote_addr` - The network address of the connecting client
    /// * `shutdown` - Shutdown signal of the client's session
    ///
    /// # Returns
    ///
    /// A unique `ConnectionId` assigned to this connection.
    pub async fn add_connection(&self, remote_addr: SocketAddr, shutdown: ShutdownSignal) -> ConnectionId {
        let connection_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let connection = ClientConnection::new(remote_addr, shutdown);
        self.connections.write().await.insert(connection_id, connection);
        info!("🔗 Connection {} from {}", connection_id, remote_addr);
        connection_id
    }

    /// Removes a connection from the manager.
    ///
    /// This should be called once a client's session has been closed.
    pub async fn remove_connection(&self, connection_id: ConnectionId) {
        let mut connections = self.connections.write().await;
        if let Some(connection) = connections.remove(&connection_id) {
            info!(
                "❌ Connection {} from {} disconnected after {:?}",
                connection_id,
                connection.remote_addr,
                connection.uptime()
            );
        }
    }

    /// Associates a user id with a connection.
    pub async fn set_user_id(&self, connection_id: ConnectionId, user_id: UserId) {
        let mut connections = self.connections.write().await;
        if let Some(connection) = connections.get_mut(&connection_id) {
            connection.user_id = Some(user_id);
            debug!("👤 Connection {} identified as user {}", connection_id, user_id);
        }
    }

    pub async fn get_user_id(&self, connection_id: ConnectionId) -> Option<UserId> {
        let connections = self.connections.read().await;
        connections.get(&connection_id).and_then(|c| c.user_id)
    }

    pub async fn get_connection_id_by_user(&self, user_id: UserId) -> Option<ConnectionId> {
        let connections = self.connections.read().await;
        connections
            .iter()
            .find(|(_, c)| c.user_id == Some(user_id))
            .map(|(id, _)| *id)
    }

    /// Asks a connection's session to shut down.
    ///
    /// The connection stays registered until its handler finishes teardown.
    pub async fn kick_connection(&self, connection_id: ConnectionId) -> Result<(), ServerError> {
        let connections = self.connections.read().await;
        let connection = connections
            .get(&connection_id)
            .ok_or_else(|| ServerError::Internal(format!("connection {connection_id} not found")))?;

        if connection.shutdown.fire() {
            info!("👢 Kicked connection {}", connection_id);
        }
        Ok(())
    }

    /// Shuts down every registered session and returns how many were signalled.
    pub async fn shutdown_all(&self) -> usize {
        let connections = self.connections.read().await;
        let fired = connections.values().filter(|c| c.shutdown.fire()).count();
        if !connections.is_empty() {
            info!("🛑 Signalled {} of {} connections to shut down", fired, connections.len());
        }
        fired
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    #[tokio::test]
    async fn test_add_and_remove_connections() {
        let manager = ConnectionManager::new();
        let first = manager.add_connection(addr(5001), ShutdownSignal::new()).await;
        let second = manager.add_connection(addr(5002), ShutdownSignal::new()).await;

        assert_ne!(first, second);
        assert_eq!(manager.connection_count().await, 2);

        manager.set_user_id(second, UserId(5002)).await;
        assert_eq!(manager.get_user_id(second).await, Some(UserId(5002)));
        assert_eq!(manager.get_connection_id_by_user(UserId(5002)).await, Some(second));

        manager.remove_connection(first).await;
        assert_eq!(manager.connection_count().await, 1);
        assert_eq!(manager.get_user_id(first).await, None);
    }

    #[tokio::test]
    async fn test_kick_and_shutdown_all_fire_session_signals() {
        let manager = ConnectionManager::new();
        let kicked = ShutdownSignal::new();
        let other = ShutdownSignal::new();

        let id = manager.add_connection(addr(6001), kicked.clone()).await;
        manager.add_connection(addr(6002), other.clone()).await;

        manager.kick_connection(id).await.expect("connection exists");
        assert!(kicked.is_fired());
        assert!(!other.is_fired());

        assert_eq!(manager.shutdown_all().await, 1);
        assert!(other.is_fired());

        assert!(manager.kick_connection(999).await.is_err());
    }
}
