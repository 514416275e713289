//! Client connection representation.
//!
//! This module defines the bookkeeping kept for each connected client.

use crate::session::ShutdownSignal;
use gamegate_jobs::UserId;
use std::net::SocketAddr;
use std::time::SystemTime;

/// Represents an individual client connection to the server.
///
/// # Fields
///
/// * `user_id` - User id assigned once the connection is identified
/// * `remote_addr` - The network address of the connected client
/// * `connected_at` - Timestamp when the connection was established
/// * `shutdown` - The session's shutdown signal, used to kick the client
#[derive(Debug)]
pub struct ClientConnection {
    /// The user ID assigned to this connection (None until assigned)
    pub user_id: Option<UserId>,

    /// The remote network address of the client
    pub remote_addr: SocketAddr,

    /// When this connection was established
    pub connected_at: SystemTime,

    /// Fires the owning session's shutdown
    pub shutdown: ShutdownSignal,
}

impl ClientConnection {
    /// Creates a new client connection with the specified remote address.
    ///
    /// # Arguments
    ///
    /// * `remote_addr` - The network address of the connecting client
    /// * `shutdown` - Shutdown signal of the client's session
    pub fn new(remote_addr: SocketAddr, shutdown: ShutdownSignal) -> Self {
        Self {
            user_id: None,
            remote_addr,
            connected_at: SystemTime::now(),
            shutdown,
        }
    }

    /// How long this client has been connected.
    pub fn uptime(&self) -> std::time::Duration {
        self.connected_at.elapsed().unwrap_or_default()
    }
}
