//! Tracking service error types.
//!
//! All errors map to HTTP status codes via the `IntoResponse` impl. Bodies
//! are short plain-text messages; the underlying cause of a store failure
//! is logged server-side and never returned to the client.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Tracking service error type.
///
/// Maps to HTTP status codes:
/// - MissingIdentifier, MissingDestination, InvalidDestination, UnsupportedEvent: 400
/// - StoreRecordingFailure, Internal: 500
#[derive(Debug, Error)]
pub enum TrackingError {
    #[error("Missing message identifier")]
    MissingIdentifier,

    #[error("Missing destination URL")]
    MissingDestination,

    #[error("Invalid destination URL: {0}")]
    InvalidDestination(String),

    #[error("Unsupported tracking event: {0}")]
    UnsupportedEvent(String),

    #[error("Store recording failed: {0}")]
    StoreRecordingFailure(String),

    #[error("Internal server error")]
    Internal,
}

impl TrackingError {
    /// Returns the HTTP status code for this error (for metrics recording).
    pub fn status_code(&self) -> u16 {
        match self {
            TrackingError::MissingIdentifier
            | TrackingError::MissingDestination
            | TrackingError::InvalidDestination(_)
            | TrackingError::UnsupportedEvent(_) => 400,
            TrackingError::StoreRecordingFailure(_) | TrackingError::Internal => 500,
        }
    }

    /// Bounded label for the `outcome` dimension of tracking metrics.
    pub fn outcome_label(&self) -> &'static str {
        match self {
            TrackingError::MissingIdentifier => "missing_identifier",
            TrackingError::MissingDestination => "missing_destination",
            TrackingError::InvalidDestination(_) => "invalid_destination",
            TrackingError::UnsupportedEvent(_) => "unsupported_event",
            TrackingError::StoreRecordingFailure(_) => "store_failure",
            TrackingError::Internal => "internal",
        }
    }
}

impl IntoResponse for TrackingError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            TrackingError::MissingIdentifier => (StatusCode::BAD_REQUEST, "Missing message ID"),
            TrackingError::MissingDestination => {
                (StatusCode::BAD_REQUEST, "Missing destination URL")
            }
            TrackingError::InvalidDestination(_) => {
                (StatusCode::BAD_REQUEST, "Invalid destination URL")
            }
            TrackingError::UnsupportedEvent(_) => {
                (StatusCode::BAD_REQUEST, "Invalid tracking event")
            }
            TrackingError::StoreRecordingFailure(err) => {
                // Log actual error server-side, return generic message to client
                tracing::error!(target: "tracking.store", error = %err, "Tracking error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Tracking failed")
            }
            TrackingError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "Tracking failed"),
        };

        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            message,
        )
            .into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;

    async fn read_body_text(body: Body) -> String {
        let bytes = body.collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(
            TrackingError::MissingIdentifier.to_string(),
            "Missing message identifier"
        );
        assert_eq!(
            TrackingError::UnsupportedEvent("bounce".to_string()).to_string(),
            "Unsupported tracking event: bounce"
        );
        assert_eq!(
            TrackingError::StoreRecordingFailure("connection refused".to_string()).to_string(),
            "Store recording failed: connection refused"
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(TrackingError::MissingIdentifier.status_code(), 400);
        assert_eq!(TrackingError::MissingDestination.status_code(), 400);
        assert_eq!(
            TrackingError::InvalidDestination("x".to_string()).status_code(),
            400
        );
        assert_eq!(
            TrackingError::UnsupportedEvent("x".to_string()).status_code(),
            400
        );
        assert_eq!(
            TrackingError::StoreRecordingFailure("x".to_string()).status_code(),
            500
        );
        assert_eq!(TrackingError::Internal.status_code(), 500);
    }

    #[tokio::test]
    async fn test_into_response_missing_identifier() {
        let response = TrackingError::MissingIdentifier.into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain; charset=utf-8"
        );
        assert_eq!(
            read_body_text(response.into_body()).await,
            "Missing message ID"
        );
    }

    #[tokio::test]
    async fn test_into_response_unsupported_event() {
        let response = TrackingError::UnsupportedEvent("bounce".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            read_body_text(response.into_body()).await,
            "Invalid tracking event"
        );
    }

    #[tokio::test]
    async fn test_into_response_store_failure_hides_cause() {
        let response =
            TrackingError::StoreRecordingFailure("password=hunter2 refused".to_string())
                .into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = read_body_text(response.into_body()).await;
        assert_eq!(body, "Tracking failed");
        assert!(!body.contains("hunter2"));
    }
}
