//! Configuration management for the gamegate server.
//!
//! This module handles loading, validation, and conversion of server configuration
//! from TOML files and command-line arguments.

use gamegate_jobs::WalletConfig;
use gamegate_server::ServerConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration settings
    pub server: ServerSettings,
    /// Per-connection job queue settings
    #[serde(default)]
    pub jobs: JobSettings,
    /// Simulated wallet settings
    #[serde(default)]
    pub wallet: WalletConfig,
    /// Logging configuration settings
    pub logging: LoggingSettings,
}

/// Server-specific configuration settings.
///
/// Controls network binding, connection limits, and per-connection buffers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Network address to bind the server to (e.g., "127.0.0.1:8080")
    pub bind_address: String,
    /// Maximum number of concurrent client connections
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Seconds without a frame from the client before it is dropped
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// Seconds a single socket write may take
    #[serde(default = "default_write_timeout_secs")]
    pub write_timeout_secs: u64,
    /// Capacity of each connection's inbound frame buffer
    #[serde(default = "default_buffer")]
    pub inbound_buffer: usize,
    /// Capacity of each connection's outbound frame buffer
    #[serde(default = "default_buffer")]
    pub outbound_buffer: usize,
    /// Platform id stamped on every wallet job
    #[serde(default = "default_platform_id")]
    pub platform_id: u32,
}

/// Job queue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSettings {
    /// Capacity of each connection's job queue
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Milliseconds to wait for a job result (0 waits forever)
    #[serde(default = "default_await_timeout_ms")]
    pub await_timeout_ms: u64,
}

/// Logging system configuration.
///
/// Controls log output format, levels, and destination settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
    /// Optional file path for log output (None means stdout only)
    pub file_path: Option<String>,
}

fn default_max_connections() -> usize {
    1000
}

fn default_idle_timeout_secs() -> u64 {
    600
}

fn default_write_timeout_secs() -> u64 {
    10
}

fn default_buffer() -> usize {
    1000
}

fn default_platform_id() -> u32 {
    1
}

fn default_queue_capacity() -> usize {
    gamegate_jobs::DEFAULT_QUEUE_CAPACITY
}

fn default_await_timeout_ms() -> u64 {
    10_000
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            await_timeout_ms: default_await_timeout_ms(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                bind_address: "127.0.0.1:8080".to_string(),
                max_connections: default_max_connections(),
                idle_timeout_secs: default_idle_timeout_secs(),
                write_timeout_secs: default_write_timeout_secs(),
                inbound_buffer: default_buffer(),
                outbound_buffer: default_buffer(),
                platform_id: default_platform_id(),
            },
            jobs: JobSettings::default(),
            wallet: WalletConfig::default(),
            logging: LoggingSettings {
                level: "info".to_string(),
                json_format: false,
                file_path: None,
            },
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, creates a default configuration file at the specified path
    /// and returns the default configuration.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// The loaded or default configuration, or an error if loading/creation failed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Converts the application configuration to a game server configuration.
    ///
    /// # Returns
    ///
    /// A `ServerConfig` instance ready for use with the game server, or an
    /// error if the bind address does not parse.
    pub fn to_server_config(&self) -> Result<ServerConfig, Box<dyn std::error::Error>> {
        Ok(ServerConfig {
            bind_address: self.server.bind_address.parse()?,
            max_connections: self.server.max_connections,
            platform_id: self.server.platform_id,
            idle_timeout_secs: self.server.idle_timeout_secs,
            write_timeout_secs: self.server.write_timeout_secs,
            inbound_buffer: self.server.inbound_buffer,
            outbound_buffer: self.server.outbound_buffer,
            queue_capacity: self.jobs.queue_capacity,
            await_timeout_ms: self.jobs.await_timeout_ms,
            wallet: self.wallet.clone(),
        })
    }

    /// Validates the configuration.
    ///
    /// # Returns
    ///
    /// `Ok(())` if the configuration is valid, or an error string describing the issue.
    pub fn validate(&self) -> Result<(), String> {
        if self.server.bind_address.parse::<std::net::SocketAddr>().is_err() {
            return Err(format!("Invalid bind address: {}", &self.server.bind_address));
        }

        if self.server.max_connections == 0 {
            return Err("server.max_connections must be greater than 0".to_string());
        }
        if self.server.idle_timeout_secs == 0 {
            return Err("server.idle_timeout_secs must be greater than 0".to_string());
        }
        if self.server.write_timeout_secs == 0 {
            return Err("server.write_timeout_secs must be greater than 0".to_string());
        }
        if self.server.inbound_buffer == 0 || self.server.outbound_buffer == 0 {
            return Err("server frame buffers must hold at least one frame".to_string());
        }
        if self.jobs.queue_capacity == 0 {
            return Err("jobs.queue_capacity must be greater than 0".to_string());
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::{NamedTempFile, TempDir};
    use tokio::fs;

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();

        assert_eq!(config.server.bind_address, "127.0.0.1:8080");
        assert_eq!(config.server.max_connections, 1000);
        assert_eq!(config.server.idle_timeout_secs, 600);
        assert_eq!(config.server.inbound_buffer, 1000);
        assert_eq!(config.server.outbound_buffer, 1000);
        assert_eq!(config.server.platform_id, 1);

        assert_eq!(config.jobs.queue_capacity, 1000);
        assert_eq!(config.jobs.await_timeout_ms, 10_000);

        assert_eq!(config.wallet.balance_delay_ms, 1000);
        assert_eq!(config.wallet.deposit_delay_ms, 3000);
        assert_eq!(config.wallet.simulated_amount, 1000);

        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json_format);
        assert!(config.logging.file_path.is_none());
    }

    #[tokio::test]
    async fn test_load_from_nonexistent_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let config = AppConfig::load_from_file(&path).await.expect("defaults are written");
        assert_eq!(config.server.bind_address, "127.0.0.1:8080");
        assert!(path.exists());

        // The written file loads back to the same settings.
        let reloaded = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(reloaded.jobs.await_timeout_ms, config.jobs.await_timeout_ms);
        assert_eq!(reloaded.wallet.deposit_delay_ms, config.wallet.deposit_delay_ms);
    }

    #[tokio::test]
    async fn test_load_from_existing_file() {
        let toml_content = r#"
[server]
bind_address = "0.0.0.0:3000"
max_connections = 2000
idle_timeout_secs = 30
platform_id = 7

[jobs]
queue_capacity = 16
await_timeout_ms = 0

[wallet]
balance_delay_ms = 5
deposit_delay_ms = 10
simulated_amount = 250

[logging]
level = "debug"
json_format = true
file_path = "/tmp/gamegate.log"
"#;

        let temp_file = NamedTempFile::new().unwrap();
        fs::write(temp_file.path(), toml_content).await.unwrap();

        let config = AppConfig::load_from_file(temp_file.path()).await.unwrap();

        assert_eq!(config.server.bind_address, "0.0.0.0:3000");
        assert_eq!(config.server.max_connections, 2000);
        assert_eq!(config.server.idle_timeout_secs, 30);
        assert_eq!(config.server.platform_id, 7);
        // Missing keys fall back to their defaults.
        assert_eq!(config.server.inbound_buffer, 1000);
        assert_eq!(config.server.write_timeout_secs, 10);

        assert_eq!(config.jobs.queue_capacity, 16);
        assert_eq!(config.jobs.await_timeout_ms, 0);
        assert_eq!(config.wallet.simulated_amount, 250);

        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json_format);
        assert_eq!(config.logging.file_path, Some("/tmp/gamegate.log".to_string()));
    }

    #[tokio::test]
    async fn test_minimal_file_uses_section_defaults() {
        let toml_content = r#"
[server]
bind_address = "127.0.0.1:9100"

[logging]
level = "warn"
"#;
        let temp_file = NamedTempFile::new().unwrap();
        fs::write(temp_file.path(), toml_content).await.unwrap();

        let config = AppConfig::load_from_file(temp_file.path()).await.unwrap();
        assert_eq!(config.jobs.queue_capacity, 1000);
        assert_eq!(config.wallet.balance_delay_ms, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_to_server_config_conversion() {
        let mut app_config = AppConfig::default();
        app_config.server.bind_address = "192.168.1.100:8080".to_string();
        app_config.server.max_connections = 3000;
        app_config.server.platform_id = 9;
        app_config.jobs.await_timeout_ms = 0;
        app_config.wallet = WalletConfig::instant();

        let server_config = app_config.to_server_config().unwrap();

        assert_eq!(server_config.bind_address.to_string(), "192.168.1.100:8080");
        assert_eq!(server_config.max_connections, 3000);
        assert_eq!(server_config.platform_id, 9);
        assert_eq!(server_config.queue_config().await_timeout, None);
        assert_eq!(server_config.session_config().idle_timeout, Duration::from_secs(600));
        assert_eq!(server_config.wallet.balance_delay_ms, 0);
    }

    #[test]
    fn test_validation_valid_config() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validation_invalid_bind_address() {
        let mut config = AppConfig::default();
        config.server.bind_address = "invalid_address".to_string();

        let result = config.validate();
        assert!(result.unwrap_err().contains("Invalid bind address"));
        assert!(config.to_server_config().is_err());
    }

    #[test]
    fn test_validation_zero_capacities() {
        let mut config = AppConfig::default();
        config.server.outbound_buffer = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.jobs.queue_capacity = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.server.idle_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_log_levels() {
        let mut config = AppConfig::default();
        for level in ["trace", "debug", "info", "warn", "error"] {
            config.logging.level = level.to_string();
            assert!(config.validate().is_ok(), "level {level} should be accepted");
        }

        config.logging.level = "verbose".to_string();
        assert!(config.validate().unwrap_err().contains("Invalid log level"));
    }
}
