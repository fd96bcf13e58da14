//! Error types for couchmesh

use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // === I/O Errors ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Orchestrator Errors ===
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Orchestrator error: {0}")]
    Orchestrator(String),

    #[error("Namespace not found: {0}")]
    NamespaceNotFound(String),

    // === In-instance command Errors ===
    #[error("Command failed on {instance}: {reason}")]
    Exec { instance: String, reason: String },

    #[error("Instance {0} has no network address")]
    MissingAddress(String),

    // === Readiness Errors ===
    #[error("Cluster {namespace} not ready after {waited:?}")]
    ReadinessTimeout { namespace: String, waited: Duration },

    // === Input / Config Errors ===
    #[error("Invalid cluster descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Config loading error: {0}")]
    ConfigLoad(#[from] config::ConfigError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic ===
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Convert to HTTP status code
    pub fn to_http_status(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Error::InvalidDescriptor(_) | Error::InvalidConfig(_) => StatusCode::BAD_REQUEST,
            Error::NamespaceNotFound(_) => StatusCode::NOT_FOUND,
            Error::Kube(kube::Error::Api(resp)) if resp.code == 404 => StatusCode::NOT_FOUND,
            Error::Kube(kube::Error::Api(resp)) if resp.code == 409 => StatusCode::CONFLICT,
            Error::ReadinessTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
