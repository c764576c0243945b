//! HTTP request handlers
//!
//! Contains handlers for all HTTP endpoints.

use std::fmt::Write as _;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse},
    Json,
};
use serde_json::json;
use tracing::{debug, instrument};

use super::AppState;
use crate::entities::{render_sensors, render_updates};
use crate::metrics::refresh_metrics;

/// Root endpoint - displays basic info
pub async fn root() -> Html<String> {
    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>pihole-stats</title>
</head>
<body>
    <h1>pihole-stats</h1>
    <p>Version: {}</p>
    <ul>
        <li><a href="/health">Health Check</a></li>
        <li><a href="/api/snapshot">Snapshot</a></li>
        <li><a href="/api/entities">Entities</a></li>
        <li><a href="/metrics">Metrics</a></li>
    </ul>
</body>
</html>"#,
        env!("CARGO_PKG_VERSION")
    );
    Html(html)
}

/// Health check endpoint - 503 while the last cycle is failing
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.handle.status();
    let code = if status.last_update_success {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        code,
        Json(json!({
            "status": if status.last_update_success { "healthy" } else { "stale" },
            "version": env!("CARGO_PKG_VERSION"),
            "update": status,
        })),
    )
}

/// Latest snapshot with update status
pub async fn snapshot(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.handle.status();

    match state.handle.snapshot() {
        Some(snapshot) => (
            StatusCode::OK,
            Json(json!({
                "available": status.last_update_success,
                "update_interval_secs": state.handle.update_interval().as_secs(),
                "status": status,
                "metrics": *snapshot,
            })),
        ),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "available": false,
                "status": status,
                "error": "no snapshot published yet",
            })),
        ),
    }
}

/// Sensor and update views
pub async fn entities(State(state): State<AppState>) -> Json<serde_json::Value> {
    let snapshot = state.handle.snapshot();
    let available = state.handle.available();

    Json(json!({
        "sensors": render_sensors(&state.naming, snapshot.as_deref(), available),
        "updates": render_updates(&state.naming, snapshot.as_deref(), available),
    }))
}

/// Refresh-now trigger
pub async fn refresh(State(state): State<AppState>) -> impl IntoResponse {
    debug!("Refresh requested over HTTP");
    state.handle.request_refresh();
    (StatusCode::ACCEPTED, Json(json!({ "status": "refresh scheduled" })))
}

/// Prometheus text output of numeric snapshot metrics and internal counters
#[instrument(skip(state), name = "metrics_handler")]
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let mut output = String::new();

    let _ = writeln!(
        output,
        "# HELP pihole_up Whether the last refresh cycle succeeded\n\
         # TYPE pihole_up gauge\n\
         pihole_up {}",
        u8::from(state.handle.available())
    );

    if let Some(snapshot) = state.handle.snapshot() {
        for (key, value) in snapshot.iter() {
            if let Some(number) = value.as_f64() {
                let _ = writeln!(
                    output,
                    "# TYPE pihole_{key} gauge\npihole_{key} {number}"
                );
            }
        }
    }

    output.push_str(&refresh_metrics().format_prometheus());

    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        output,
    )
}
