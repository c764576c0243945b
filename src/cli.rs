//! CLI argument parsing for pihole-stats
//!
//! This module provides the command-line interface using clap derive macros.
//!
//! # Precedence
//!
//! Configuration values are resolved in the following order (highest to lowest priority):
//! 1. CLI arguments
//! 2. Environment variables
//! 3. Configuration file
//! 4. Default values

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// pihole-stats - Pi-hole v6 metrics poller
///
/// Periodically logs into a Pi-hole appliance, reads its status endpoints
/// and serves the result as a flat metrics snapshot.
#[derive(Parser, Debug)]
#[command(name = "pihole-stats")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config.yaml",
        env = "PIHOLE_STATS_CONFIG"
    )]
    pub config: PathBuf,

    /// Appliance host (overrides config file)
    #[arg(long, value_name = "HOST", env = "PIHOLE_STATS_HOST")]
    pub host: Option<String>,

    /// Appliance port (overrides config file)
    #[arg(long, value_name = "PORT", env = "PIHOLE_STATS_APPLIANCE_PORT")]
    pub appliance_port: Option<u16>,

    /// Appliance app password (overrides config file)
    #[arg(long, value_name = "KEY", env = "PIHOLE_STATS_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Refresh interval in seconds (overrides config file)
    #[arg(short, long, value_name = "SECS", env = "PIHOLE_STATS_INTERVAL")]
    pub interval: Option<u64>,

    /// Refresh cycle timeout in seconds (overrides config file)
    #[arg(long, value_name = "SECS", env = "PIHOLE_STATS_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Server port (overrides config file)
    #[arg(short, long, value_name = "PORT", env = "PIHOLE_STATS_PORT")]
    pub port: Option<u16>,

    /// Server bind address (overrides config file)
    #[arg(long, value_name = "ADDRESS", env = "PIHOLE_STATS_BIND_ADDRESS")]
    pub bind_address: Option<String>,

    /// File the session id is persisted to (overrides config file)
    #[arg(long, value_name = "FILE", env = "PIHOLE_STATS_SESSION_FILE")]
    pub session_file: Option<PathBuf>,

    /// Validate configuration and exit
    #[arg(long)]
    pub validate: bool,

    /// Run a single refresh cycle, print the snapshot and exit
    #[arg(long, conflicts_with = "validate")]
    pub once: bool,

    /// Log level
    #[arg(
        short,
        long,
        value_enum,
        default_value = "info",
        env = "PIHOLE_STATS_LOG_LEVEL"
    )]
    pub log_level: LogLevel,

    /// Output format for --validate and --once
    #[arg(long, value_enum, default_value = "text")]
    pub output_format: OutputFormat,
}

/// Log level options
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// Output format options for validate and one-shot modes
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Yaml => write!(f, "yaml"),
        }
    }
}
