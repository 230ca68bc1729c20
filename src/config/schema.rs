//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Index name used when none is configured, following the `<Model>ByDownloadStatus`
/// naming convention of the record table.
pub const DEFAULT_STATUS_INDEX: &str = "CuestionarioResponseByDownloadStatus";

/// Root configuration for the responses API.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ApiConfig {
    /// Listener configuration (bind address, limits).
    pub listener: ListenerConfig,

    /// Cross-origin response headers.
    pub cors: CorsConfig,

    /// Where the expected API key comes from.
    pub secrets: SecretsConfig,

    /// Record table settings.
    pub store: StoreConfig,

    /// Per-credential request limits.
    pub rate_limit: RateLimitConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Request timeout (total time for request/response) in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Value of `Access-Control-Allow-Origin`.
    pub allowed_origin: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origin: "*".to_string(),
        }
    }
}

/// Backend holding the API key secret.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SecretProvider {
    /// Secret id names an environment variable holding the JSON payload.
    #[default]
    Env,
    /// Secret id is a path to a JSON file holding the payload.
    File,
}

/// Secret source configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecretsConfig {
    /// Secret backend.
    pub provider: SecretProvider,

    /// Identifier of the secret within the backend. Unset means every
    /// authenticated request is rejected.
    pub secret_id: Option<String>,

    /// How long a fetched key is trusted, in seconds.
    pub cache_ttl_secs: u64,
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            provider: SecretProvider::Env,
            secret_id: None,
            cache_ttl_secs: 300,
        }
    }
}

/// Record table configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Record table identifier. Unset makes every record route answer 500.
    pub table_name: Option<String>,

    /// Secondary index keyed by `downloadStatus`.
    pub status_index: String,

    /// Whether the local store provisions the status index.
    pub status_index_enabled: bool,

    /// Optional JSON file with records to load into the local store.
    pub seed_path: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            table_name: None,
            status_index: DEFAULT_STATUS_INDEX.to_string(),
            status_index_enabled: true,
            seed_path: None,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Requests admitted per window per credential prefix.
    pub max_requests: u32,

    /// Window length in seconds.
    pub window_secs: u64,

    /// Number of leading credential characters used as the bucket key.
    pub key_prefix_len: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window_secs: 60,
            key_prefix_len: 8,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Human readable, for development.
    Pretty,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Json,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
