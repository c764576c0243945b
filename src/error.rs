//! Error types for pihole-stats
//!
//! This module defines the error types used throughout the application.

use serde::Serialize;
use thiserror::Error;

/// Transport 계층 에러 (네트워크 수준)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// HTTP 클라이언트 초기화 실패
    #[error("Failed to initialize HTTP client: {0}")]
    Init(String),

    /// 잘못된 URL
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// 타임아웃
    #[error("Request timed out")]
    Timeout,

    /// 연결 실패
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// 요청/응답 처리 실패
    #[error("HTTP request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::ConnectionFailed(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

/// User-facing failure category reported for a failed refresh cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Credential rejected or session could not be established
    Authentication,
    /// Appliance unreachable, network error or cycle timeout
    Connectivity,
    /// Appliance answered with an unexpected response shape
    Data,
}

impl FailureKind {
    /// Stable lowercase label
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Authentication => "authentication",
            FailureKind::Connectivity => "connectivity",
            FailureKind::Data => "data",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while talking to the appliance or reading its payloads
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApplianceError {
    /// Login rejected or login response carried no usable session id
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Network failure, timeout or unreachable appliance
    #[error("Appliance unreachable: {0}")]
    Connectivity(String),

    /// Session id rejected while reading an endpoint
    #[error("Session rejected by endpoint '{endpoint}' (HTTP {status})")]
    AuthorizationExpired { endpoint: String, status: u16 },

    /// Structurally unexpected response
    #[error("Malformed response from '{endpoint}': {reason}")]
    MalformedData { endpoint: String, reason: String },
}

impl ApplianceError {
    /// Failure category reported to consumers
    pub fn kind(&self) -> FailureKind {
        match self {
            ApplianceError::Authentication(_) | ApplianceError::AuthorizationExpired { .. } => {
                FailureKind::Authentication
            }
            ApplianceError::Connectivity(_) => FailureKind::Connectivity,
            ApplianceError::MalformedData { .. } => FailureKind::Data,
        }
    }

    /// Whether the cached session id must be dropped after this error
    pub fn clears_session(&self) -> bool {
        matches!(
            self,
            ApplianceError::Authentication(_) | ApplianceError::AuthorizationExpired { .. }
        )
    }

    pub fn malformed(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        ApplianceError::MalformedData {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }
}

impl From<TransportError> for ApplianceError {
    fn from(err: TransportError) -> Self {
        ApplianceError::Connectivity(err.to_string())
    }
}

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// HTTP transport error
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Appliance error
    #[error("Appliance error: {0}")]
    Appliance(#[from] ApplianceError),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;
