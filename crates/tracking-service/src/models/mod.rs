//! Data models for the tracking service.

use crate::errors::TrackingError;
use serde::Deserialize;
use std::fmt;

/// Query parameters accepted by `GET /track`.
///
/// All fields are optional at the extractor level so that validation errors
/// surface as [`TrackingError`] variants instead of extractor rejections.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackingQuery {
    /// Tracking event type (`open` or `click`).
    pub event: Option<String>,

    /// Provider message identifier.
    pub id: Option<String>,

    /// Destination URL for click events (already percent-decoded).
    pub url: Option<String>,
}

/// Kind of tracking event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingEvent {
    /// The tracking pixel was loaded.
    Open,
    /// A tracked link was followed.
    Click,
}

impl TrackingEvent {
    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackingEvent::Open => "open",
            TrackingEvent::Click => "click",
        }
    }
}

impl fmt::Display for TrackingEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated tracking request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackingRequest {
    Open { message_id: String },
    Click {
        message_id: String,
        destination: String,
    },
}

impl TrackingRequest {
    /// The event kind of this request.
    pub fn event(&self) -> TrackingEvent {
        match self {
            TrackingRequest::Open { .. } => TrackingEvent::Open,
            TrackingRequest::Click { .. } => TrackingEvent::Click,
        }
    }
}

impl TryFrom<TrackingQuery> for TrackingRequest {
    type Error = TrackingError;

    /// Validate raw query parameters.
    ///
    /// The identifier is checked before the event type, so a request missing
    /// both reports `MissingIdentifier`.
    fn try_from(query: TrackingQuery) -> Result<Self, Self::Error> {
        let message_id = query
            .id
            .filter(|id| !id.is_empty())
            .ok_or(TrackingError::MissingIdentifier)?;

        match query.event.as_deref() {
            Some("open") => Ok(TrackingRequest::Open { message_id }),
            Some("click") => {
                let destination = query
                    .url
                    .filter(|url| !url.is_empty())
                    .ok_or(TrackingError::MissingDestination)?;
                Ok(TrackingRequest::Click {
                    message_id,
                    destination,
                })
            }
            other => Err(TrackingError::UnsupportedEvent(
                other.unwrap_or_default().to_string(),
            )),
        }
    }
}

/// RPC payload for the "record open" store operation.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RecordOpenParams<'a> {
    pub p_provider_message_id: &'a str,
}

/// RPC payload for the "record click" store operation.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RecordClickParams<'a> {
    pub p_provider_message_id: &'a str,
    pub p_link_url: &'a str,
}
