//! Error types and handling for the game server.
//!
//! This module defines the error types that can occur during server operations,
//! providing clear categorization of different failure modes.

/// Enumeration of possible server errors.
///
/// Network errors end the affected connection (or the accept loop when
/// binding fails). Protocol errors mean a client sent something the command
/// dispatcher cannot act on and also end that client's connection.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Network-related errors such as binding failures or connection issues
    #[error("Network error: {0}")]
    Network(String),

    /// A client frame violated the command protocol
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Internal server errors such as a stopped job worker
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors returned by [`Session`](crate::Session) operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Shutdown has fired; no more frames can be sent or received
    #[error("connection is closed")]
    ConnectionClosed,

    /// `run` was called on a session whose pumps are already started
    #[error("session pumps are already running")]
    AlreadyRunning,
}

impl From<SessionError> for ServerError {
    fn from(error: SessionError) -> Self {
        ServerError::Network(error.to_string())
    }
}

impl From<gamegate_jobs::QueueError> for ServerError {
    fn from(error: gamegate_jobs::QueueError) -> Self {
        ServerError::Internal(error.to_string())
    }
}
