//! Application configuration
//!
//! This module provides centralized configuration management using the `config` crate.
//! Configuration can be loaded from environment variables and config files.

use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use validator::Validate;

use crate::error::AppError;

/// Main application configuration
#[derive(Debug, Deserialize, Clone, Validate)]
pub struct AppConfig {
    #[validate(nested)]
    pub udp: UdpConfig,
    #[validate(nested)]
    pub database: DatabaseConfig,
    pub ledger: LedgerConfig,
    pub log: LogConfig,
}

/// UDP listener configuration
#[derive(Debug, Deserialize, Clone, Validate)]
pub struct UdpConfig {
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// Listening port devices are provisioned with
    #[serde(default = "default_port")]
    pub port: u16,

    /// Datagrams processed concurrently; 1 means strictly sequential
    #[serde(default = "default_max_in_flight")]
    #[validate(range(min = 1, max = 4096))]
    pub max_in_flight: usize,

    /// Receive buffer size in bytes
    #[serde(default = "default_max_datagram_size")]
    #[validate(range(min = 16, max = 65507))]
    pub max_datagram_size: usize,

    /// How long a cancelled loop waits for in-flight datagrams
    #[serde(default = "default_drain_timeout")]
    pub drain_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9000
}

fn default_max_in_flight() -> usize {
    64
}

fn default_max_datagram_size() -> usize {
    1024
}

fn default_drain_timeout() -> u64 {
    5
}

impl UdpConfig {
    /// Get the socket bind address
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for UdpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_in_flight: default_max_in_flight(),
            max_datagram_size: default_max_datagram_size(),
            drain_timeout_secs: default_drain_timeout(),
        }
    }
}

/// Database configuration
#[derive(Debug, Deserialize, Clone, Validate)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    #[validate(length(min = 1))]
    pub url: String,

    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    #[validate(range(min = 1))]
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection acquire timeout in seconds
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,

    /// Idle connection timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Apply bundled migrations at startup
    #[serde(default)]
    pub run_migrations: bool,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_acquire_timeout() -> u64 {
    30
}

fn default_idle_timeout() -> u64 {
    600
}

/// Billing ledger reconciliation settings
#[derive(Debug, Deserialize, Clone)]
pub struct LedgerConfig {
    /// Age after which a pending billing record is reported as orphaned
    #[serde(default = "default_pending_grace")]
    pub pending_grace_secs: u64,

    /// Interval between pending-record sweeps; 0 disables the sweeper
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_pending_grace() -> u64 {
    60
}

fn default_sweep_interval() -> u64 {
    300
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            pending_grace_secs: default_pending_grace(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable text
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Builder pre-populated with every default
    pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("udp.host", default_host())?
            .set_default("udp.port", default_port() as i64)?
            .set_default("udp.max_in_flight", default_max_in_flight() as i64)?
            .set_default("udp.max_datagram_size", default_max_datagram_size() as i64)?
            .set_default("udp.drain_timeout_secs", default_drain_timeout() as i64)?
            .set_default("database.max_connections", default_max_connections() as i64)?
            .set_default("database.min_connections", default_min_connections() as i64)?
            .set_default("database.acquire_timeout_secs", default_acquire_timeout() as i64)?
            .set_default("database.idle_timeout_secs", default_idle_timeout() as i64)?
            .set_default("database.run_migrations", false)?
            .set_default("ledger.pending_grace_secs", default_pending_grace() as i64)?
            .set_default("ledger.sweep_interval_secs", default_sweep_interval() as i64)?
            .set_default("log.level", default_log_level())?
            .set_default("log.json", false)
    }

    /// Load configuration from `.env`, optional config files, and environment
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = Self::builder_with_defaults()?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables with KIOSK_ prefix
            .add_source(
                Environment::with_prefix("KIOSK")
                    .separator("__")
                    .try_parsing(true),
            )
            // Support the conventional DATABASE_URL
            .set_override_option("database.url", env::var("DATABASE_URL").ok())?
            .build()?;

        let config: AppConfig = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_with(overrides: &[(&str, &str)]) -> Result<AppConfig, AppError> {
        let mut builder = AppConfig::builder_with_defaults()?;
        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }
        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    #[test]
    fn test_defaults() {
        let config = load_with(&[("database.url", "postgresql://localhost/kiosk")]).unwrap();
        assert_eq!(config.udp.port, 9000);
        assert_eq!(config.udp.bind_addr(), "0.0.0.0:9000");
        assert_eq!(config.udp.max_in_flight, 64);
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.ledger.pending_grace_secs, 60);
        assert!(!config.log.json);
    }

    #[test]
    fn test_missing_database_url_fails() {
        assert!(matches!(load_with(&[]), Err(AppError::Config(_))));
    }

    #[test]
    fn test_zero_in_flight_rejected() {
        let result = load_with(&[
            ("database.url", "postgresql://localhost/kiosk"),
            ("udp.max_in_flight", "0"),
        ]);
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_default_udp_config() {
        let udp = UdpConfig::default();
        assert_eq!(udp.port, 9000);
        assert_eq!(udp.max_datagram_size, 1024);
    }
}
