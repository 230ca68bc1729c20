//! Transport-independent request view.
//!
//! # Responsibilities
//! - Extract method, path and headers from the transport request
//! - Default missing values (`GET`, `/`, no headers)
//! - Case-insensitive header lookup, including the `x-api-key` credential
//!
//! # Design Decisions
//! - Headers are kept as received; lookups compare names ASCII case-insensitively
//! - Non-UTF-8 header values are dropped, never passed to handlers

use axum::http::{HeaderMap, Method, Request};

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Header map with case-insensitive lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    /// First value whose name matches `name` ignoring ASCII case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl From<&HeaderMap> for Headers {
    fn from(map: &HeaderMap) -> Self {
        map.iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str(), v)))
            .collect()
    }
}

/// The parts of an incoming request the dispatcher looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub headers: Headers,
}

impl Default for ApiRequest {
    fn default() -> Self {
        Self {
            method: Method::GET,
            path: "/".to_string(),
            headers: Headers::new(),
        }
    }
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            method,
            path: if path.is_empty() { "/".to_string() } else { path },
            headers: Headers::new(),
        }
    }

    /// Builder-style header insertion.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Build from an HTTP request; the body is ignored.
    pub fn from_http<B>(request: &Request<B>) -> Self {
        Self {
            headers: Headers::from(request.headers()),
            ..Self::new(request.method().clone(), request.uri().path())
        }
    }

    /// Presented API key, or empty when the header is missing.
    pub fn credential(&self) -> &str {
        self.headers.get(API_KEY_HEADER).unwrap_or_default()
    }
}
