//! pihole-stats - Pi-hole v6 metrics poller
//!
//! Periodically refreshes a flat metrics snapshot from a Pi-hole appliance
//! and serves it over HTTP.

use anyhow::Result;
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};

use pihole_stats::cli::{Cli, OutputFormat};
use pihole_stats::config::Config;
use pihole_stats::coordinator::Coordinator;
use pihole_stats::entities::EntityNaming;
use pihole_stats::normalizer::MetricSnapshot;
use pihole_stats::server::{self, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    pihole_stats::init_logging(&cli.log_level.to_string())?;

    if cli.validate {
        let mut config = Config::load(&cli.config)?;
        config.apply_cli(&cli);
        config.validate()?;
        print_config(&config, cli.output_format)?;
        return Ok(());
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting pihole-stats"
    );

    let mut config = Config::load_or_default(&cli.config)?;
    config.apply_cli(&cli);
    config.validate()?;

    if config.appliance.api_key.is_none() {
        warn!("No api_key configured, logging in with an empty password");
    }

    let mut coordinator = Coordinator::from_config(&config)?;

    if cli.once {
        let snapshot = coordinator.refresh().await?;
        print_snapshot(&snapshot, cli.output_format)?;
        return Ok(());
    }

    let state = AppState {
        handle: coordinator.handle(),
        naming: EntityNaming::new(config.instance),
    };

    tokio::select! {
        _ = coordinator.run() => {}
        result = server::run(&config.server, state), if config.server.enabled => {
            result?;
        }
        _ = shutdown_signal() => {}
    }

    info!("Shutdown complete");
    Ok(())
}

fn print_config(config: &Config, format: OutputFormat) -> Result<()> {
    let mut redacted = config.clone();
    if redacted.appliance.api_key.is_some() {
        redacted.appliance.api_key = Some("********".to_string());
    }

    match format {
        OutputFormat::Text => {
            println!("Configuration is valid");
            println!("  appliance: {}", redacted.appliance.base_url());
            println!("  interval:  {}s", redacted.refresh.interval_secs);
            println!("  timeout:   {}s", redacted.refresh.timeout_secs);
            if redacted.server.enabled {
                println!(
                    "  server:    {}:{}",
                    redacted.server.bind_address, redacted.server.port
                );
            } else {
                println!("  server:    disabled");
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&redacted)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&redacted)?),
    }
    Ok(())
}

fn print_snapshot(snapshot: &MetricSnapshot, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            for (key, value) in snapshot.iter() {
                println!("{}: {}", key, value);
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(snapshot)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(snapshot)?),
    }
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        }
    }
}
