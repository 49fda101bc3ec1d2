//! TOML Configuration File Support
//!
//! Centralized configuration loading for the broadcaster, supporting a TOML
//! file at `~/.config/sse-broadcaster/broadcaster.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments (applied by the daemon through [`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [server]
//! bind_addr = "0.0.0.0:8080"
//! route_prefix = "/sse"
//!
//! [delivery]
//! buffer_capacity = 100
//! keepalive_interval_secs = 30
//! count_report_interval_ms = 500
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::subscriber::DEFAULT_BUFFER_CAPACITY;
use crate::transport::pump::DEFAULT_KEEPALIVE_INTERVAL;

/// Default listen address
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Default path prefix for the subscribe and dispatch routes
pub const DEFAULT_ROUTE_PREFIX: &str = "/sse";

/// Default interval between subscriber-count reports
pub const DEFAULT_COUNT_REPORT_INTERVAL: Duration = Duration::from_millis(500);

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Server section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerToml {
    /// Listen address, e.g. "127.0.0.1:8080"
    pub bind_addr: Option<String>,

    /// Path prefix for subscribe/dispatch
    pub route_prefix: Option<String>,
}

/// Delivery section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryToml {
    /// Per-subscriber buffer capacity
    pub buffer_capacity: Option<usize>,

    /// Idle seconds before a keepalive block is sent
    pub keepalive_interval_secs: Option<u64>,

    /// Milliseconds between subscriber-count reports (0 disables)
    pub count_report_interval_ms: Option<u64>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcasterToml {
    /// Server configuration section
    pub server: ServerToml,

    /// Delivery configuration section
    pub delivery: DeliveryToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Effective broadcaster configuration
///
/// Use [`load_config`] to load it with proper priority handling.
#[derive(Clone, Debug)]
pub struct BroadcasterConfig {
    /// Address the HTTP server binds to
    pub bind_addr: SocketAddr,

    /// Path prefix for the subscribe and dispatch routes
    pub route_prefix: String,

    /// Per-subscriber buffer capacity
    pub buffer_capacity: usize,

    /// Idle time before a keepalive block is sent
    pub keepalive_interval: Duration,

    /// Interval between subscriber-count reports (zero disables them)
    pub count_report_interval: Duration,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Source of configuration values
    source: ConfigSource,
}

impl Default for BroadcasterConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            route_prefix: DEFAULT_ROUTE_PREFIX.to_string(),
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            keepalive_interval: DEFAULT_KEEPALIVE_INTERVAL,
            count_report_interval: DEFAULT_COUNT_REPORT_INTERVAL,
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl BroadcasterConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Set the configuration source
    pub fn set_source(&mut self, source: ConfigSource) {
        self.source = source;
    }

    /// Check the values that the server cannot run with
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] for a zero buffer capacity, a
    /// zero keepalive interval, or a route prefix not starting with `/`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "buffer_capacity must be at least 1".to_string(),
            ));
        }
        if self.keepalive_interval.is_zero() {
            return Err(ConfigError::ValidationError(
                "keepalive interval must be greater than zero".to_string(),
            ));
        }
        if !self.route_prefix.starts_with('/') {
            return Err(ConfigError::ValidationError(format!(
                "route_prefix must start with '/': {:?}",
                self.route_prefix
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/sse-broadcaster/broadcaster.toml` or
/// `~/.config/sse-broadcaster/broadcaster.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("sse-broadcaster").join("broadcaster.toml"))
}

/// Load configuration from the default path, environment and defaults
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be read or parsed, or
/// if the resulting configuration fails validation. A missing config file is
/// not an error.
pub fn load_config() -> Result<BroadcasterConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed, or
/// if the resulting configuration fails validation.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<BroadcasterConfig, ConfigError> {
    let mut config = BroadcasterConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: BroadcasterToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config)?;
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config);

    config.validate()?;
    Ok(config)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(
    config: &mut BroadcasterConfig,
    toml: &BroadcasterToml,
) -> Result<(), ConfigError> {
    if let Some(ref addr) = toml.server.bind_addr {
        config.bind_addr = addr.parse().map_err(|e| {
            ConfigError::ValidationError(format!("invalid bind_addr {addr:?}: {e}"))
        })?;
    }
    if let Some(ref prefix) = toml.server.route_prefix {
        config.route_prefix.clone_from(prefix);
    }

    if let Some(capacity) = toml.delivery.buffer_capacity {
        config.buffer_capacity = capacity;
    }
    if let Some(secs) = toml.delivery.keepalive_interval_secs {
        config.keepalive_interval = Duration::from_secs(secs);
    }
    if let Some(ms) = toml.delivery.count_report_interval_ms {
        config.count_report_interval = Duration::from_millis(ms);
    }
    Ok(())
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(variable = name, value = %raw, "Ignoring unparseable environment value");
            None
        }
    }
}

/// Apply environment variable overrides to the config
fn apply_env_config(config: &mut BroadcasterConfig) {
    if let Some(addr) = env_parsed::<SocketAddr>("BROADCASTER_BIND") {
        config.bind_addr = addr;
        config.source = ConfigSource::Env;
    }
    if let Ok(prefix) = std::env::var("BROADCASTER_ROUTE_PREFIX") {
        config.route_prefix = prefix;
        config.source = ConfigSource::Env;
    }
    if let Some(capacity) = env_parsed::<usize>("BROADCASTER_BUFFER_CAPACITY") {
        config.buffer_capacity = capacity;
        config.source = ConfigSource::Env;
    }
    if let Some(secs) = env_parsed::<u64>("BROADCASTER_KEEPALIVE_SECS") {
        config.keepalive_interval = Duration::from_secs(secs);
        config.source = ConfigSource::Env;
    }
    if let Some(ms) = env_parsed::<u64>("BROADCASTER_COUNT_REPORT_MS") {
        config.count_report_interval = Duration::from_millis(ms);
        config.source = ConfigSource::Env;
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Bind address override
    pub bind_addr: Option<SocketAddr>,

    /// Route prefix override
    pub route_prefix: Option<String>,

    /// Buffer capacity override
    pub buffer_capacity: Option<usize>,

    /// Keepalive interval override (seconds)
    pub keepalive_secs: Option<u64>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set bind address override
    #[must_use]
    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = Some(addr);
        self
    }

    /// Set route prefix override
    #[must_use]
    pub fn with_route_prefix(mut self, prefix: String) -> Self {
        self.route_prefix = Some(prefix);
        self
    }

    /// Set buffer capacity override
    #[must_use]
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = Some(capacity);
        self
    }

    /// Set keepalive interval override
    #[must_use]
    pub fn with_keepalive_secs(mut self, secs: u64) -> Self {
        self.keepalive_secs = Some(secs);
        self
    }

    /// Apply overrides to a configuration, then re-validate it
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if an override produces an
    /// unusable configuration.
    pub fn apply(&self, config: &mut BroadcasterConfig) -> Result<(), ConfigError> {
        if self.bind_addr.is_some()
            || self.route_prefix.is_some()
            || self.buffer_capacity.is_some()
            || self.keepalive_secs.is_some()
        {
            config.source = ConfigSource::Cli;
        }

        if let Some(addr) = self.bind_addr {
            config.bind_addr = addr;
        }
        if let Some(ref prefix) = self.route_prefix {
            config.route_prefix.clone_from(prefix);
        }
        if let Some(capacity) = self.buffer_capacity {
            config.buffer_capacity = capacity;
        }
        if let Some(secs) = self.keepalive_secs {
            config.keepalive_interval = Duration::from_secs(secs);
        }

        config.validate()
    }
}

// =============================================================================
// Tests
// =============================================================================
