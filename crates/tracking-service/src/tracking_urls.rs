//! Builders for the links embedded in outgoing email.
//!
//! Mail senders call these to produce the open pixel URL and the wrapped
//! click URLs that route through `GET /track`.

use crate::routes::TRACK_PATH;
use reqwest::Url;
use thiserror::Error;

/// The base URL could not be combined into an absolute tracking URL.
#[derive(Debug, Error)]
#[error("Invalid tracking base URL '{base}': {reason}")]
pub struct InvalidBaseUrl {
    pub base: String,
    pub reason: String,
}

/// Build the tracking pixel URL for `message_id`.
///
/// # Errors
///
/// Returns [`InvalidBaseUrl`] if `base_url` is not an absolute URL.
pub fn pixel_url(base_url: &str, message_id: &str) -> Result<Url, InvalidBaseUrl> {
    build(base_url, &[("event", "open"), ("id", message_id)])
}

/// Build a click tracking URL that redirects to `destination`.
///
/// The destination is percent-encoded into the `url` parameter.
///
/// # Errors
///
/// Returns [`InvalidBaseUrl`] if `base_url` is not an absolute URL.
pub fn click_url(
    base_url: &str,
    message_id: &str,
    destination: &str,
) -> Result<Url, InvalidBaseUrl> {
    build(
        base_url,
        &[("event", "click"), ("id", message_id), ("url", destination)],
    )
}

fn build(base_url: &str, params: &[(&str, &str)]) -> Result<Url, InvalidBaseUrl> {
    let base = base_url.trim_end_matches('/');
    let mut url = Url::parse(&format!("{}{}", base, TRACK_PATH)).map_err(|e| InvalidBaseUrl {
        base: base_url.to_string(),
        reason: e.to_string(),
    })?;
    url.query_pairs_mut().extend_pairs(params.iter().copied());
    Ok(url)
}
