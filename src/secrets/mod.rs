//! Secret source adapters.
//!
//! # Data Flow
//! ```text
//! SecretCache (security/secret_cache.rs)
//!     → SecretSource::get_secret(id)
//!         → env.rs  (JSON payload in an environment variable)
//!         → file.rs (JSON payload in a file)
//!     → SecretPayload { apiKey }
//! ```
//!
//! # Design Decisions
//! - Adapters return explicit errors; callers decide how to degrade
//! - Payload parsing is shared so every backend accepts the same document

pub mod env;
pub mod file;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

pub use env::EnvSecretSource;
pub use file::FileSecretSource;

/// Errors raised while obtaining the expected API key.
#[derive(Debug, Error)]
pub enum SecretError {
    /// No secret identifier configured.
    #[error("secret id not configured")]
    NotConfigured,

    /// The backend could not be reached or refused the request.
    #[error("secret fetch failed: {0}")]
    Fetch(String),

    /// The backend answered with a document that is not a secret payload.
    #[error("malformed secret payload: {0}")]
    Malformed(String),
}

/// Document stored in the secret backend.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct SecretPayload {
    #[serde(rename = "apiKey", default)]
    pub api_key: Option<String>,
}

impl SecretPayload {
    /// Parse the JSON document held by a backend.
    pub fn from_json(raw: &str) -> Result<Self, SecretError> {
        serde_json::from_str(raw).map_err(|e| SecretError::Malformed(e.to_string()))
    }
}

/// Backend able to hand out the secret document for an identifier.
#[async_trait]
pub trait SecretSource: Send + Sync {
    /// Fetch the secret stored under `id`.
    async fn get_secret(&self, id: &str) -> Result<SecretPayload, SecretError>;
}
