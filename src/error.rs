//! API error types.

use axum::http::StatusCode;

use crate::http::response::{ApiResponse, CorsHeaders};
use crate::store::StoreError;

/// Failures raised by route handlers.
///
/// Only the status code and the `error` string reach the client; the
/// detail carried by `Internal` is for logs.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("record table is not configured")]
    Configuration,

    #[error("not found: {0}")]
    NotFound(&'static str),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Get the HTTP status code for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Configuration | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The `error` string shown to the client.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::Configuration => "Configuration error",
            Self::NotFound(what) => what,
            Self::Internal(_) => "Internal server error",
        }
    }

    pub fn to_response(&self, cors: &CorsHeaders) -> ApiResponse {
        ApiResponse::error(cors, self.status(), self.public_message())
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Self::Internal(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::Configuration.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ApiError::NotFound("Response not found").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::from(StoreError::Backend("throttled".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_detail_not_exposed() {
        let err = ApiError::from(StoreError::TableNotFound("secret-table-name".into()));
        let resp = err.to_response(&CorsHeaders::default());
        assert_eq!(resp.body, json!({"error": "Internal server error"}));
        assert!(matches!(&err, ApiError::Internal(detail) if detail.contains("secret-table-name")));
    }

    #[test]
    fn test_configuration_body() {
        let resp = ApiError::Configuration.to_response(&CorsHeaders::default());
        assert_eq!(resp.body, json!({"error": "Configuration error"}));
    }
}
