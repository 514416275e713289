//! Main application logic and lifecycle management.
//!
//! This module contains the `Application` struct that orchestrates server
//! startup, signal handling, and phased shutdown.

use crate::{
    cli::CliArgs,
    config::AppConfig,
    logging::display_banner,
    signals::{wait_for_shutdown_signal, wait_for_shutdown_signal_silent},
};
use gamegate_server::GameServer;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// How long shutdown waits for the accept loop and for sessions to close.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(8);

/// Main application struct.
///
/// Owns the merged configuration and the game server for the lifetime of
/// the process.
pub struct Application {
    /// Loaded application configuration
    config: AppConfig,
    /// Game server instance
    server: Arc<GameServer>,
}

impl Application {
    /// Creates a new application instance.
    ///
    /// # Arguments
    ///
    /// * `config` - Configuration already merged with command-line overrides
    ///
    /// # Process
    ///
    /// 1. Validate merged configuration
    /// 2. Display startup banner
    /// 3. Build the game server
    pub fn new(config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {e}").into());
        }
        info!("✅ Configuration loaded and validated successfully");

        display_banner();

        let server = GameServer::new(config.to_server_config()?);
        Ok(Self {
            config,
            server: Arc::new(server),
        })
    }

    /// Runs the server until a termination signal, then shuts down in phases.
    ///
    /// A second signal during shutdown exits the process immediately.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        info!("🌟 Starting Gamegate Server Application");
        self.log_configuration_summary();

        let server_handle = {
            let server = self.server.clone();
            tokio::spawn(async move {
                match server.start().await {
                    Ok(()) => info!("✅ Server completed successfully"),
                    Err(e) => {
                        error!("❌ Server error: {}", e);
                        std::process::exit(1);
                    }
                }
            })
        };

        info!("✅ Gamegate is now running!");
        info!("🎮 Ready to accept connections on ws://{}", self.config.server.bind_address);
        info!("🛑 Press Ctrl+C to gracefully shutdown");

        wait_for_shutdown_signal().await?;

        // merciless shutdown
        tokio::spawn(async move {
            if let Err(e) = wait_for_shutdown_signal_silent().await {
                error!("Failed to set up merciless shutdown signal handler: {e}");
                return;
            }

            warn!("Shutdown handler received again! I'll make this quick.");
            std::process::exit(1);
        });

        info!("📡 Phase 1: Stopping the accept loop...");
        self.server.shutdown();
        match tokio::time::timeout(SHUTDOWN_GRACE, server_handle).await {
            Ok(_) => info!("✅ Accept loop stopped"),
            Err(_) => warn!("⏰ Accept loop did not stop within {:?}", SHUTDOWN_GRACE),
        }

        info!("⏳ Phase 2: Waiting for sessions to close...");
        if self.server.wait_for_connections(SHUTDOWN_GRACE).await {
            info!("✅ All sessions closed");
        } else {
            let remaining = self.server.get_connection_manager().connection_count().await;
            warn!("⏰ {} sessions still open, exiting anyway", remaining);
        }

        info!("✅ Gamegate shutdown complete");
        Ok(())
    }

    /// Logs the configuration summary at startup.
    fn log_configuration_summary(&self) {
        info!("📋 Configuration Summary:");
        info!("  🌐 Bind address: {}", self.config.server.bind_address);
        info!("  👥 Max connections: {}", self.config.server.max_connections);
        info!("  ⏱️ Idle timeout: {}s", self.config.server.idle_timeout_secs);
        info!(
            "  📦 Buffers: {} in / {} out / {} jobs",
            self.config.server.inbound_buffer, self.config.server.outbound_buffer, self.config.jobs.queue_capacity
        );
        match self.config.jobs.await_timeout_ms {
            0 => info!("  ⏳ Job wait: unbounded"),
            ms => info!("  ⏳ Job wait: {}ms", ms),
        }
        info!(
            "  💰 Wallet: balance {}ms, deposit {}ms, amount {}",
            self.config.wallet.balance_delay_ms, self.config.wallet.deposit_delay_ms, self.config.wallet.simulated_amount
        );
    }
}

/// Applies command-line overrides on top of the file configuration.
pub(crate) fn apply_overrides(config: &mut AppConfig, args: CliArgs) {
    if let Some(bind_address) = args.bind_address {
        config.server.bind_address = bind_address;
    }

    if let Some(log_level) = args.log_level {
        config.logging.level = log_level;
    }

    if args.json_logs {
        config.logging.json_format = true;
    }
}
