//! Offline cache data types.
//!
//! A cache entry pairs a [`RequestKey`] (method + URL) with a
//! [`FetchResponse`] snapshot: status, headers and the full body. Bodies are
//! `Bytes`, so handing out a stored response clones a reference count, not
//! the payload.

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use std::fmt;

/// Lifecycle phase of the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerPhase {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    /// Install failed; the worker never serves.
    Redundant,
}

impl WorkerPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerPhase::Parsed => "parsed",
            WorkerPhase::Installing => "installing",
            WorkerPhase::Installed => "installed",
            WorkerPhase::Activating => "activating",
            WorkerPhase::Activated => "activated",
            WorkerPhase::Redundant => "redundant",
        }
    }
}

impl fmt::Display for WorkerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a request is fetching, as reported by fetch metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestDestination {
    /// A top-level navigation.
    Document,
    Script,
    Style,
    Image,
    Font,
    #[default]
    Other,
}

impl RequestDestination {
    /// Derive the destination from `Sec-Fetch-Dest` / `Sec-Fetch-Mode`.
    ///
    /// `Sec-Fetch-Mode: navigate` marks a navigation even when the
    /// destination header is missing.
    pub fn from_fetch_metadata(dest: Option<&str>, mode: Option<&str>) -> Self {
        let from_dest = match dest.map(str::to_ascii_lowercase).as_deref() {
            Some("document") => RequestDestination::Document,
            Some("script") => RequestDestination::Script,
            Some("style") => RequestDestination::Style,
            Some("image") => RequestDestination::Image,
            Some("font") => RequestDestination::Font,
            _ => RequestDestination::Other,
        };

        match mode {
            Some(m) if m.eq_ignore_ascii_case("navigate") => RequestDestination::Document,
            _ => from_dest,
        }
    }

    /// Read the destination from request headers.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let read = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
        Self::from_fetch_metadata(read("sec-fetch-dest"), read("sec-fetch-mode"))
    }

    pub fn is_navigational(&self) -> bool {
        matches!(self, RequestDestination::Document)
    }
}

/// Cache lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    pub method: Method,
    /// Path and query, e.g. `/styles.css?v=2`.
    pub url: String,
}

impl RequestKey {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
        }
    }

    /// Key of a `GET` request, the only kind the cache stores.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }
}

/// An intercepted request.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: Method,
    /// Path and query relative to the origin.
    pub url: String,
    pub destination: RequestDestination,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl FetchRequest {
    /// A plain `GET` with no headers.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            destination: RequestDestination::Other,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// A top-level navigation to `url`.
    pub fn navigation(url: impl Into<String>) -> Self {
        Self::get(url).with_destination(RequestDestination::Document)
    }

    pub fn with_destination(mut self, destination: RequestDestination) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn key(&self) -> RequestKey {
        RequestKey::new(self.method.clone(), self.url.clone())
    }

    /// Whether the request carries `Cookie` or `Authorization`.
    ///
    /// The response to a credentialed request belongs to one client and is
    /// never read from or written to the shared cache while online.
    pub fn is_credentialed(&self) -> bool {
        self.headers.contains_key(header::COOKIE)
            || self.headers.contains_key(header::AUTHORIZATION)
    }
}

/// Where the worker got the response it served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    /// The live namespace.
    Cache,
    /// The network, after a cache miss or for an uncacheable request.
    Network,
    /// The cached fallback document, for a navigation while offline.
    Fallback,
    /// The built-in offline page, for a navigation while offline with no
    /// fallback cached.
    OfflinePage,
}

impl ResponseSource {
    /// Bounded label for the `outcome` dimension of lookup metrics.
    pub fn lookup_label(&self) -> &'static str {
        match self {
            ResponseSource::Cache => "hit",
            ResponseSource::Network => "miss",
            ResponseSource::Fallback => "fallback",
            ResponseSource::OfflinePage => "offline_page",
        }
    }
}

/// A response snapshot, either fresh from the network or read from the cache.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl FetchResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Stored body size in bytes.
    pub fn size(&self) -> u64 {
        self.body.len() as u64
    }

    /// Whether the response may be stored and replayed to other clients.
    ///
    /// `Set-Cookie`, `Cache-Control: private` or `no-store`, and `Vary: *`
    /// mark a response as client-specific.
    pub fn is_shareable(&self) -> bool {
        if self.headers.contains_key(header::SET_COOKIE) {
            return false;
        }

        let client_specific =
            header_tokens(&self.headers, header::CACHE_CONTROL).any(|directive| {
                // `private="set-cookie"` names fields but is still private
                let name = directive.split('=').next().unwrap_or_default().trim();
                name.eq_ignore_ascii_case("private") || name.eq_ignore_ascii_case("no-store")
            });
        let varies_by_everything = header_tokens(&self.headers, header::VARY).any(|f| f == "*");

        !client_specific && !varies_by_everything
    }
}

/// Comma-separated tokens of every `name` header, trimmed.
fn header_tokens(headers: &HeaderMap, name: HeaderName) -> impl Iterator<Item = &str> {
    headers
        .get_all(name)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(str::trim)
}

impl IntoResponse for FetchResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// Headers that describe a single connection and must not be forwarded or
/// replayed from the cache.
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "host",
    "content-length",
    "transfer-encoding",
    "te",
    "trailer",
    "upgrade",
    "keep-alive",
    "proxy-connection",
    "proxy-authorization",
];

/// Remove hop-by-hop headers in place.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP_HEADERS {
        headers.remove(*name);
    }
}
