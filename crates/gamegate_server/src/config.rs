//! Server configuration types and defaults.
//!
//! This module contains the server configuration structure and default values
//! used to initialize and customize the game server behavior.

use crate::session::SessionConfig;
use gamegate_jobs::{PlatformId, QueueConfig, WalletConfig};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Configuration structure for the game server.
///
/// Contains network settings, per-connection buffer sizes and deadlines,
/// the per-connection job queue settings, and the simulated wallet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The socket address to bind the server to
    pub bind_address: SocketAddr,

    /// Maximum number of concurrent connections allowed
    pub max_connections: usize,

    /// Platform id stamped on every wallet job
    pub platform_id: u32,

    /// Seconds without an inbound frame before a connection is dropped
    pub idle_timeout_secs: u64,

    /// Seconds a single socket write may take
    pub write_timeout_secs: u64,

    /// Capacity of each connection's inbound frame buffer
    pub inbound_buffer: usize,

    /// Capacity of each connection's outbound frame buffer
    pub outbound_buffer: usize,

    /// Capacity of each connection's job queue
    pub queue_capacity: usize,

    /// Milliseconds to wait for a job result (0 waits forever)
    pub await_timeout_ms: u64,

    /// Simulated wallet latencies and answers
    pub wallet: WalletConfig,
}

impl ServerConfig {
    pub fn platform(&self) -> PlatformId {
        PlatformId(self.platform_id)
    }

    /// Session settings derived from this configuration.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            inbound_buffer: self.inbound_buffer,
            outbound_buffer: self.outbound_buffer,
            idle_timeout: Duration::from_secs(self.idle_timeout_secs),
            write_timeout: Duration::from_secs(self.write_timeout_secs),
        }
    }

    /// Job queue settings derived from this configuration.
    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            capacity: self.queue_capacity,
            await_timeout: match self.await_timeout_ms {
                0 => None,
                ms => Some(Duration::from_millis(ms)),
            },
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 8080)),
            max_connections: 1000,
            platform_id: 1,
            idle_timeout_secs: 600,
            write_timeout_secs: 10,
            inbound_buffer: 1000,
            outbound_buffer: 1000,
            queue_capacity: gamegate_jobs::DEFAULT_QUEUE_CAPACITY,
            await_timeout_ms: gamegate_jobs::DEFAULT_AWAIT_TIMEOUT.as_millis() as u64,
            wallet: WalletConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_configs() {
        let config = ServerConfig::default();
        let session = config.session_config();
        assert_eq!(session.idle_timeout, Duration::from_secs(600));
        assert_eq!(session.inbound_buffer, 1000);

        let queue = config.queue_config();
        assert_eq!(queue.capacity, 1000);
        assert_eq!(queue.await_timeout, Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_zero_await_timeout_disables_bound() {
        let config = ServerConfig {
            await_timeout_ms: 0,
            ..ServerConfig::default()
        };
        assert_eq!(config.queue_config().await_timeout, None);
    }
}
