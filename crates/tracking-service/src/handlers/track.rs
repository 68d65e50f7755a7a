//! Email open/click tracking handler.
//!
//! - `GET /track?event=open&id={message_id}` returns a 1x1 transparent GIF
//! - `GET /track?event=click&id={message_id}&url={destination}` returns a 302
//!   to the decoded destination
//!
//! Every valid request makes exactly one recording call to the data store.
//! Duplicate opens and clicks (mail client prefetching, double clicks) are
//! recorded as separate events; deduplication belongs to the store.
//!
//! A store that answers with an error status still gets the pixel or the
//! redirect. A store that cannot be reached turns the request into a 500 and
//! the pixel/redirect is not served.

use crate::errors::TrackingError;
use crate::models::{TrackingEvent, TrackingQuery, TrackingRequest};
use crate::observability::metrics::{record_store_call, record_tracking_event};
use crate::routes::AppState;
use crate::services::RecordOutcome;
use axum::{
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument, warn};

/// 1x1 transparent GIF (base64 `R0lGODlhAQABAIAAAAAAAP///yH5BAEAAAAALAAAAAABAAEAAAIBRAA7`).
pub static TRANSPARENT_GIF: [u8; 42] = [
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
    0x00, 0xff, 0xff, 0xff, 0x21, 0xf9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00,
    0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x01, 0x44, 0x00, 0x3b,
];

/// Content type of the tracking pixel.
pub const PIXEL_CONTENT_TYPE: &str = "image/gif";

/// Keeps intermediaries from answering repeat opens from their own cache.
const PIXEL_CACHE_CONTROL: &str = "no-cache, no-store, must-revalidate";

/// Handler for GET /track
#[instrument(skip_all, name = "tracking.track")]
pub async fn track_event(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TrackingQuery>,
) -> Result<Response, TrackingError> {
    let request = TrackingRequest::try_from(query).inspect_err(|e| {
        debug!(target: "tracking.handlers", error = %e, "Rejected tracking request");
        record_tracking_event("invalid", e.outcome_label());
    })?;

    let event = request.event();

    let result = match &request {
        TrackingRequest::Open { message_id } => {
            let outcome = record(event, state.store.record_open(message_id)).await?;
            log_outcome(event, message_id, &outcome);
            pixel_response()
        }
        TrackingRequest::Click {
            message_id,
            destination,
        } => {
            // Validate before recording so a bad URL never reaches the store.
            let location = HeaderValue::from_bytes(destination.as_bytes()).map_err(|e| {
                let err = TrackingError::InvalidDestination(e.to_string());
                record_tracking_event(event.as_str(), err.outcome_label());
                err
            })?;

            let outcome = record(event, state.store.record_click(message_id, destination)).await?;
            log_outcome(event, message_id, &outcome);
            (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
        }
    };

    Ok(result)
}

/// Await a store call, recording its latency and failure metrics.
async fn record<F>(event: TrackingEvent, call: F) -> Result<RecordOutcome, TrackingError>
where
    F: std::future::Future<Output = Result<RecordOutcome, TrackingError>>,
{
    let start = Instant::now();
    let result = call.await;
    record_store_call(event.as_str(), start.elapsed());

    if let Err(e) = &result {
        record_tracking_event(event.as_str(), e.outcome_label());
    }

    result
}

fn log_outcome(event: TrackingEvent, message_id: &str, outcome: &RecordOutcome) {
    match outcome {
        RecordOutcome::Recorded => {
            debug!(target: "tracking.handlers", %event, message_id = %message_id, "Tracking event recorded");
            record_tracking_event(event.as_str(), "recorded");
        }
        RecordOutcome::Rejected { status } => {
            warn!(
                target: "tracking.handlers",
                %event,
                message_id = %message_id,
                store_status = status,
                "Store rejected tracking event, responding normally"
            );
            record_tracking_event(event.as_str(), "rejected");
        }
    }
}

fn pixel_response() -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, PIXEL_CONTENT_TYPE),
            (header::CACHE_CONTROL, PIXEL_CACHE_CONTROL),
        ],
        TRANSPARENT_GIF.as_slice(),
    )
        .into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::STANDARD, Engine};

    #[test]
    fn test_transparent_gif_matches_encoded_pixel() {
        let decoded = STANDARD
            .decode("R0lGODlhAQABAIAAAAAAAP///yH5BAEAAAAALAAAAAABAAEAAAIBRAA7")
            .unwrap();
        assert_eq!(decoded, TRANSPARENT_GIF.to_vec());
    }

    #[test]
    fn test_pixel_response_headers() {
        let response = pixel_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            PIXEL_CONTENT_TYPE
        );
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            PIXEL_CACHE_CONTROL
        );
    }
}
