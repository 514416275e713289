//! Connection management for client connections.
//!
//! This module tracks live client connections so the server can report
//! counts, associate user ids, and stop every session on shutdown.

pub mod client;
pub mod manager;

pub use client::ClientConnection;
pub use manager::ConnectionManager;

/// Type alias for connection identifiers.
///
/// Connection IDs are used to uniquely identify client connections
/// throughout their lifecycle on the server.
pub type ConnectionId = usize;
