//! Offline cache error types.
//!
//! Lifecycle misuse and storage failures are 5xx: the proxy cannot serve.
//! `NetworkUnavailable` reaching a client means the origin was down and
//! nothing in the cache could stand in, which the proxy reports as 502.

use crate::models::WorkerPhase;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Offline cache error type.
///
/// Maps to HTTP status codes:
/// - InvalidRequest: 400
/// - NetworkUnavailable: 502
/// - NotActivated: 503
/// - AssetPrecacheFailure, InvalidPhase, Storage, Internal: 500
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Network unavailable: {0}")]
    NetworkUnavailable(String),

    #[error("Failed to precache {path}: {reason}")]
    AssetPrecacheFailure { path: String, reason: String },

    #[error("Cannot {operation} while {phase}")]
    InvalidPhase {
        operation: &'static str,
        phase: WorkerPhase,
    },

    #[error("Worker is not activated (phase: {0})")]
    NotActivated(WorkerPhase),

    #[error("Cache storage error: {0}")]
    Storage(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal server error")]
    Internal,
}

impl CacheError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            CacheError::InvalidRequest(_) => 400,
            CacheError::NetworkUnavailable(_) => 502,
            CacheError::NotActivated(_) => 503,
            CacheError::AssetPrecacheFailure { .. }
            | CacheError::InvalidPhase { .. }
            | CacheError::Storage(_)
            | CacheError::Internal => 500,
        }
    }
}

impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            CacheError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "Invalid request"),
            CacheError::NetworkUnavailable(err) => {
                tracing::warn!(target: "offline_cache.errors", error = %err, "Origin unreachable");
                (StatusCode::BAD_GATEWAY, "Network unavailable")
            }
            CacheError::NotActivated(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "Offline cache not ready")
            }
            CacheError::AssetPrecacheFailure { .. }
            | CacheError::InvalidPhase { .. }
            | CacheError::Storage(_)
            | CacheError::Internal => {
                tracing::error!(target: "offline_cache.errors", error = %self, "Offline cache error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            message,
        )
            .into_response()
    }
}
