//! services/api/src/error.rs
//!
//! The error type shared by the Soul Map binaries and the REST handlers.

use crate::config::ConfigError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use soul_map_core::ports::PortError;
use soul_map_core::postcard::ExportError;
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The environment did not describe a runnable service.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An adapter could not be built.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// A postcard could not be rasterized.
    #[error("Export Error: {0}")]
    Export(#[from] ExportError),

    /// Binding the listener or writing the OpenAPI document failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::Export(_) => (StatusCode::INTERNAL_SERVER_ERROR, "EXPORT_FAILED"),
            ApiError::Port(PortError::Unavailable(_)) => (StatusCode::BAD_GATEWAY, "UPSTREAM_UNAVAILABLE"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };
        error!("Request failed: {}", self);

        let body = Json(json!({
            "error": {
                "code": code,
                "message": self.to_string(),
            }
        }));
        (status, body).into_response()
    }
}
