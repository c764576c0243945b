//! HTTP server module
//!
//! Provides the Axum-based HTTP server that exposes the latest snapshot.

pub mod handlers;

use std::net::SocketAddr;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::coordinator::CoordinatorHandle;
use crate::entities::EntityNaming;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Read-only view of the refresh coordinator
    pub handle: CoordinatorHandle,
    /// Entity naming for this instance
    pub naming: EntityNaming,
}

/// Build the router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .route("/api/snapshot", get(handlers::snapshot))
        .route("/api/entities", get(handlers::entities))
        .route("/api/refresh", post(handlers::refresh))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Parse the configured bind address
///
/// Handles "localhost" specially, otherwise parses as IP address.
pub fn bind_addr(config: &ServerConfig) -> Result<SocketAddr> {
    let ip: std::net::IpAddr = if config.bind_address == "localhost" {
        std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST)
    } else {
        config.bind_address.parse().map_err(|e| {
            anyhow::anyhow!(
                "Invalid bind_address '{}': {}. Use an IP address (e.g., '0.0.0.0', '127.0.0.1') or 'localhost'.",
                config.bind_address,
                e
            )
        })?
    };
    Ok(SocketAddr::from((ip, config.port)))
}

/// Run the HTTP server until the future is dropped
///
/// # Errors
/// Returns an error if the server fails to bind or serve
pub async fn run(config: &ServerConfig, state: AppState) -> Result<()> {
    let addr = bind_addr(config)?;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}
