//! Core game server implementation.
//!
//! This module contains the main `GameServer` struct: the accept loop, the
//! connection limit, and server-wide shutdown.

use crate::{
    config::ServerConfig,
    connection::ConnectionManager,
    error::ServerError,
    server::handlers::{handle_connection, ConnectionContext},
    session::ShutdownSignal,
};
use gamegate_jobs::{SimulatedWallet, TransactionIdGenerator, WalletBackend};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, error, info, info_span, warn, Instrument};

/// The core game server structure.
///
/// `GameServer` accepts WebSocket clients and gives each one its own session,
/// job queue, and command loop. Server-wide state is limited to the
/// connection registry, the transaction id generator, and the wallet backend.
pub struct GameServer {
    /// Server configuration settings
    config: Arc<ServerConfig>,

    /// Registry of live client connections
    connection_manager: Arc<ConnectionManager>,

    /// Shared so transaction ids stay unique across connections
    transactions: Arc<TransactionIdGenerator>,

    /// Wallet every connection's job worker talks to
    wallet: Arc<dyn WalletBackend>,

    /// One permit per connection slot, taken before the handshake
    slots: Arc<Semaphore>,

    /// Fired to stop the accept loop
    shutdown: ShutdownSignal,
}

impl GameServer {
    /// Creates a new game server backed by the simulated wallet.
    ///
    /// # Arguments
    ///
    /// * `config` - Configuration parameters for server behavior
    pub fn new(config: ServerConfig) -> Self {
        let wallet = Arc::new(SimulatedWallet::new(config.wallet.clone()));
        Self::with_wallet(config, wallet)
    }

    /// Creates a new game server that talks to the given wallet backend.
    pub fn with_wallet(config: ServerConfig, wallet: Arc<dyn WalletBackend>) -> Self {
        let slots = config.max_connections.min(Semaphore::MAX_PERMITS);
        Self {
            slots: Arc::new(Semaphore::new(slots)),
            config: Arc::new(config),
            connection_manager: Arc::new(ConnectionManager::new()),
            transactions: Arc::new(TransactionIdGenerator::new()),
            wallet,
            shutdown: ShutdownSignal::new(),
        }
    }

    /// Binds the configured address and serves until shutdown.
    ///
    /// # Returns
    ///
    /// `Ok(())` after a graceful shutdown, or a `ServerError` if the address
    /// could not be bound.
    pub async fn start(&self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.config.bind_address)
            .await
            .map_err(|e| ServerError::Network(format!("Failed to bind {}: {e}", self.config.bind_address)))?;

        info!("🌐 Listening on ws://{}", self.config.bind_address);
        self.serve(listener).await
    }

    /// Runs the accept loop on an already-bound listener until shutdown.
    ///
    /// When the loop stops, every live session is signalled to shut down.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.fired() => {
                    info!("🛑 Accept loop stopping - shutdown initiated");
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => self.accept(stream, addr).await,
                    Err(e) => error!("Failed to accept connection: {}", e),
                },
            }
        }

        info!("🧹 Performing server cleanup...");
        self.connection_manager.shutdown_all().await;
        info!("✅ Server cleanup completed");
        Ok(())
    }

    async fn accept(&self, stream: TcpStream, addr: SocketAddr) {
        let Some(slot) = self.reserve_slot() else {
            warn!(
                "🚫 Refusing connection from {}: all {} slots in use",
                addr, self.config.max_connections
            );
            return;
        };

        if let Err(e) = stream.set_nodelay(true) {
            debug!("Could not set TCP_NODELAY for {}: {}", addr, e);
        }

        let ctx = self.context();
        tokio::spawn(
            async move {
                match handle_connection(stream, addr, ctx).await {
                    Ok(()) => {}
                    Err(ServerError::Protocol(e)) => warn!("⚠️ Dropped client {}: {}", addr, e),
                    Err(e) => error!("Connection error: {}", e),
                }
                // The slot frees only after the connection is unregistered.
                drop(slot);
            }
            .instrument(info_span!("connection", %addr)),
        );
    }

    fn reserve_slot(&self) -> Option<OwnedSemaphorePermit> {
        self.slots.clone().try_acquire_owned().ok()
    }

    fn context(&self) -> ConnectionContext {
        ConnectionContext {
            config: self.config.clone(),
            connections: self.connection_manager.clone(),
            transactions: self.transactions.clone(),
            wallet: self.wallet.clone(),
        }
    }

    /// Initiates server shutdown.
    ///
    /// Returns `true` if this call started the shutdown.
    pub fn shutdown(&self) -> bool {
        let fired = self.shutdown.fire();
        if fired {
            info!("🛑 Shutting down server...");
        }
        fired
    }

    /// The signal that stops the accept loop, for wiring to process signals.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Waits until every connection has been unregistered, for at most `timeout`.
    ///
    /// Returns `true` if no connections remain.
    pub async fn wait_for_connections(&self, timeout: Duration) -> bool {
        let drained = tokio::time::timeout(timeout, async {
            while self.connection_manager.connection_count().await > 0 {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        })
        .await;
        drained.is_ok()
    }

    pub fn get_connection_manager(&self) -> Arc<ConnectionManager> {
        self.connection_manager.clone()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}
