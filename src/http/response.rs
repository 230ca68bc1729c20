//! Response envelope.
//!
//! # Responsibilities
//! - Attach CORS and JSON content-type headers to every response
//! - Carry a JSON body and a status code
//! - Convert into an axum response at the transport edge
//!
//! # Design Decisions
//! - Every response, errors included, goes through the same envelope
//! - Header values are validated once at startup, not per request

use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue, InvalidHeaderValue};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{json, Value};

pub const ALLOW_HEADERS: &str = "Content-Type,x-api-key,X-Api-Key";
pub const ALLOW_METHODS: &str = "GET,POST,OPTIONS";

/// Pre-built CORS headers shared by every response.
#[derive(Debug, Clone)]
pub struct CorsHeaders {
    headers: HeaderMap,
}

impl CorsHeaders {
    pub fn new(allowed_origin: &str) -> Result<Self, InvalidHeaderValue> {
        Ok(Self::with_origin(HeaderValue::from_str(allowed_origin)?))
    }

    fn with_origin(origin: HeaderValue) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOW_HEADERS),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        );
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Self { headers }
    }

    pub fn get(&self, name: &HeaderName) -> Option<&HeaderValue> {
        self.headers.get(name)
    }
}

impl Default for CorsHeaders {
    fn default() -> Self {
        Self::with_origin(HeaderValue::from_static("*"))
    }
}

/// Status, headers and JSON body of an API response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: StatusCode, cors: &CorsHeaders, body: Value) -> Self {
        Self {
            status,
            headers: cors.headers.clone(),
            body,
        }
    }

    /// 200 with a serialized body. Serialization failures become a 500.
    pub fn ok<T: Serialize>(cors: &CorsHeaders, body: &T) -> Self {
        match serde_json::to_value(body) {
            Ok(body) => Self::new(StatusCode::OK, cors, body),
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode response body");
                Self::error(cors, StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }

    /// `{error}` body.
    pub fn error(cors: &CorsHeaders, status: StatusCode, error: &str) -> Self {
        Self::new(status, cors, json!({ "error": error }))
    }

    /// `{error, message}` body.
    pub fn error_with_message(
        cors: &CorsHeaders,
        status: StatusCode,
        error: &str,
        message: &str,
    ) -> Self {
        Self::new(status, cors, json!({ "error": error, "message": message }))
    }

    pub fn header(&self, name: &HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        // Json sets content-type itself; ours overrides it with the same value
        (self.status, self.headers, Json(self.body)).into_response()
    }
}

/// Current UTC time as ISO-8601 with milliseconds and a `Z` suffix.
pub fn iso_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
