//! # Gamegate Server - Main Entry Point
//!
//! WebSocket gateway that lets each client drive slow wallet operations
//! through a dedicated background job queue. This entry point handles CLI
//! parsing, configuration loading, logging, and application lifecycle.
//!
//! ## Quick Start
//!
//! ```bash
//! # Run with default configuration
//! gamegate
//!
//! # Specify custom configuration
//! gamegate --config production.toml
//!
//! # Override specific settings
//! gamegate --bind 0.0.0.0:8080 --log-level debug
//!
//! # JSON logging for production
//! gamegate --json-logs
//! ```
//!
//! ## Configuration
//!
//! The server loads configuration from a TOML file (default: `config.toml`).
//! If the file doesn't exist, a default configuration will be created.
//!
//! ## Signal Handling
//!
//! The server shuts down gracefully on SIGINT or SIGTERM (Ctrl+C on
//! Windows). A second signal exits immediately.

use tracing::{error, info};

mod app;
mod cli;
mod config;
mod logging;
mod signals;

use app::Application;
use cli::CliArgs;
use config::AppConfig;

/// Main entry point for the gamegate server.
///
/// # Exit Codes
///
/// * **0**: Successful execution and shutdown
/// * **1**: Error during startup, configuration, or runtime
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Logging needs the merged settings, so a bad file is reported on stderr.
    let config = match load_config(&args).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load configuration from {}: {e}", args.config_path.display());
            std::process::exit(1);
        }
    };

    if let Err(e) = logging::setup_logging(&config.logging, args.json_logs) {
        eprintln!("❌ Failed to setup logging: {e}");
        std::process::exit(1);
    }
    info!("🔧 Configuration loaded from: {}", args.config_path.display());

    match Application::new(config) {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Application error: {:?}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("❌ Failed to start application: {e:?}");
            std::process::exit(1);
        }
    }

    Ok(())
}

/// Loads the configuration file once and applies command-line overrides.
async fn load_config(args: &CliArgs) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let mut config = AppConfig::load_from_file(&args.config_path).await?;
    app::apply_overrides(&mut config, args.clone());
    Ok(config)
}

// Re-export main types for potential library usage
pub use config::{JobSettings, LoggingSettings, ServerSettings};

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_default_config_builds_server_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());

        let server_config = config.to_server_config().expect("default config converts");
        assert_eq!(server_config.bind_address.to_string(), "127.0.0.1:8080");
        assert_eq!(server_config.platform_id, 1);
    }

    #[tokio::test]
    async fn test_cli_overrides_win_over_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let args = CliArgs::try_parse_from([
            "gamegate",
            "--config",
            path.to_str().unwrap(),
            "--bind",
            "127.0.0.1:0",
            "--log-level",
            "warn",
            "--json-logs",
        ])
        .unwrap();

        let config = load_config(&args).await.unwrap();

        assert_eq!(config.server.bind_address, "127.0.0.1:0");
        assert_eq!(config.logging.level, "warn");
        assert!(config.logging.json_format);
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_application_rejects_invalid_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let args = CliArgs::try_parse_from([
            "gamegate",
            "--config",
            path.to_str().unwrap(),
            "--log-level",
            "chatty",
        ])
        .unwrap();

        let config = load_config(&args).await.unwrap();

        let result = Application::new(config);
        let message = result.err().expect("invalid log level is rejected").to_string();
        assert!(message.contains("Configuration validation failed"));
    }

    #[tokio::test]
    async fn test_malformed_file_is_an_error_not_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        tokio::fs::write(&path, "[server\nbind_address = ").await.unwrap();

        let args = CliArgs::try_parse_from(["gamegate", "--config", path.to_str().unwrap()]).unwrap();

        assert!(load_config(&args).await.is_err());
        let untouched = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(untouched, "[server\nbind_address = ");
    }
}
