//! Configuration management for pihole-stats
//!
//! Handles loading and validating configuration from YAML files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::cli::Cli;
use crate::client::Endpoint;
use crate::normalizer::{PercentConventions, PercentScale};

/// Bounds for the refresh interval, in seconds
pub const MIN_INTERVAL_SECS: u64 = 1;
pub const MAX_INTERVAL_SECS: u64 = 3600;

/// Upper bound for the per-cycle timeout, in seconds
pub const MAX_TIMEOUT_SECS: u64 = 300;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Error reading the configuration file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Error parsing the configuration file
    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Configuration validation error
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Appliance connection settings
    #[serde(default)]
    pub appliance: ApplianceConfig,

    /// Refresh cycle settings
    #[serde(default)]
    pub refresh: RefreshConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Session persistence settings
    #[serde(default)]
    pub state: StateConfig,

    /// 1-based creation order of this instance, used for entity numbering
    #[serde(default = "default_instance")]
    pub instance: u32,
}

/// Appliance connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplianceConfig {
    /// Appliance host name or IP address
    #[serde(default = "default_host")]
    pub host: String,

    /// Appliance HTTP port
    #[serde(default = "default_appliance_port")]
    pub port: u16,

    /// Use https instead of http
    #[serde(default)]
    pub use_tls: bool,

    /// Shared secret exchanged for a session id
    pub api_key: Option<String>,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Endpoint path overrides, keyed by endpoint name
    #[serde(default)]
    pub endpoints: BTreeMap<String, String>,
}

/// Refresh cycle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Seconds between two refresh cycles
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Bound for one whole refresh cycle, in seconds
    #[serde(default = "default_cycle_timeout")]
    pub timeout_secs: u64,

    /// Percent convention overrides, keyed by metric
    #[serde(default)]
    pub percent: BTreeMap<String, PercentScale>,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Serve the snapshot over HTTP
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Server bind address
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

/// Session persistence configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateConfig {
    /// File the last session id is written back to
    pub session_file: Option<PathBuf>,
}

// Default value functions
fn default_host() -> String {
    "pi.hole".to_string()
}

fn default_appliance_port() -> u16 {
    80
}

fn default_request_timeout() -> u64 {
    5000
}

fn default_interval() -> u64 {
    5
}

fn default_cycle_timeout() -> u64 {
    15
}

fn default_true() -> bool {
    true
}

fn default_port() -> u16 {
    9617
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_instance() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            appliance: ApplianceConfig::default(),
            refresh: RefreshConfig::default(),
            server: ServerConfig::default(),
            state: StateConfig::default(),
            instance: default_instance(),
        }
    }
}

impl Default for ApplianceConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_appliance_port(),
            use_tls: false,
            api_key: None,
            request_timeout_ms: default_request_timeout(),
            endpoints: BTreeMap::new(),
        }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            timeout_secs: default_cycle_timeout(),
            percent: BTreeMap::new(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            port: default_port(),
            bind_address: default_bind_address(),
        }
    }
}

impl ApplianceConfig {
    /// Base URL of the appliance API, e.g. `http://pi.hole:80`
    pub fn base_url(&self) -> String {
        let scheme = if self.use_tls { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }

    /// Endpoint table with configured path overrides applied
    pub fn endpoint_paths(&self) -> Vec<(Endpoint, String)> {
        Endpoint::ALL
            .iter()
            .map(|endpoint| {
                let path = self
                    .endpoints
                    .get(endpoint.name())
                    .cloned()
                    .unwrap_or_else(|| endpoint.default_path().to_string());
                (*endpoint, path)
            })
            .collect()
    }
}

impl RefreshConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Percent conventions with configured overrides applied
    pub fn percent_conventions(&self) -> PercentConventions {
        let mut conventions = PercentConventions::default();
        for (metric, scale) in &self.percent {
            conventions.set(metric, *scale);
        }
        conventions
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// Values are not validated here; call [`Config::validate`] after CLI
    /// overrides have been applied.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a YAML file, falling back to defaults if not found
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Config file not found, using defaults"
            );
            return Ok(Self::default());
        }

        Self::load(path)
    }

    /// Apply command line overrides on top of file values
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(ref host) = cli.host {
            self.appliance.host = host.clone();
        }
        if let Some(port) = cli.appliance_port {
            self.appliance.port = port;
        }
        if let Some(ref key) = cli.api_key {
            self.appliance.api_key = Some(key.clone());
        }
        if let Some(interval) = cli.interval {
            self.refresh.interval_secs = interval;
        }
        if let Some(timeout) = cli.timeout {
            self.refresh.timeout_secs = timeout;
        }
        if let Some(port) = cli.port {
            self.server.port = port;
        }
        if let Some(ref bind) = cli.bind_address {
            self.server.bind_address = bind.clone();
        }
        if let Some(ref file) = cli.session_file {
            self.state.session_file = Some(file.clone());
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.appliance.host.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "Appliance host must not be empty".to_string(),
            ));
        }

        if self.appliance.port == 0 {
            return Err(ConfigError::ValidationError(
                "Appliance port must be greater than 0".to_string(),
            ));
        }

        if self.appliance.request_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "Request timeout must be greater than 0".to_string(),
            ));
        }

        for (name, path) in &self.appliance.endpoints {
            if Endpoint::from_name(name).is_none() {
                return Err(ConfigError::ValidationError(format!(
                    "Unknown endpoint '{}'",
                    name
                )));
            }
            if !path.starts_with('/') {
                return Err(ConfigError::ValidationError(format!(
                    "Endpoint path for '{}' must start with '/'",
                    name
                )));
            }
        }

        if !(MIN_INTERVAL_SECS..=MAX_INTERVAL_SECS).contains(&self.refresh.interval_secs) {
            return Err(ConfigError::ValidationError(format!(
                "Refresh interval must be between {} and {} seconds",
                MIN_INTERVAL_SECS, MAX_INTERVAL_SECS
            )));
        }

        if self.refresh.timeout_secs == 0 || self.refresh.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(ConfigError::ValidationError(format!(
                "Refresh timeout must be between 1 and {} seconds",
                MAX_TIMEOUT_SECS
            )));
        }

        for metric in self.refresh.percent.keys() {
            if !PercentConventions::is_percent_metric(metric) {
                return Err(ConfigError::ValidationError(format!(
                    "'{}' is not a percentage metric",
                    metric
                )));
            }
        }

        if self.server.enabled && self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "Server port must be greater than 0".to_string(),
            ));
        }

        if self.instance == 0 {
            return Err(ConfigError::ValidationError(
                "Instance number is 1-based".to_string(),
            ));
        }

        Ok(())
    }
}
