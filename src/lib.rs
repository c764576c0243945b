//! pihole-stats library
//!
//! This crate provides the core functionality for polling a Pi-hole v6
//! appliance: session handling, concurrent endpoint fetches, table-driven
//! normalization into a flat metric snapshot, and the refresh cycle that
//! publishes it.

pub mod cli;
pub mod client;
pub mod config;
pub mod coordinator;
pub mod entities;
pub mod error;
pub mod metrics;
pub mod normalizer;
pub mod server;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the logging subsystem
///
/// # Arguments
/// * `level` - Log level string (trace, debug, info, warn, error)
///
/// # Errors
/// Returns an error if the logging system fails to initialize
pub fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
