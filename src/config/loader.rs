//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ApiConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable overriding `cors.allowed_origin`.
pub const ENV_ALLOWED_ORIGIN: &str = "ALLOWED_ORIGIN";
/// Environment variable overriding `secrets.secret_id`.
pub const ENV_SECRET_ID: &str = "API_KEY_SECRET_ARN";
/// Environment variable overriding `store.table_name`.
pub const ENV_TABLE_NAME: &str = "CUESTIONARIO_RESPONSE_TABLE_NAME";
/// Environment variable overriding `store.status_index`.
pub const ENV_STATUS_INDEX: &str = "DOWNLOAD_STATUS_GSI_NAME";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from an optional TOML file, apply process environment
/// overrides and validate the result.
pub fn load_config(path: Option<&Path>) -> Result<ApiConfig, ConfigError> {
    let config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => ApiConfig::default(),
    };

    let config = apply_env_overrides(config, |name| std::env::var(name).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay environment values onto a parsed config.
///
/// Empty values are ignored so that an exported-but-blank variable does not
/// erase a file setting.
pub fn apply_env_overrides<F>(mut config: ApiConfig, lookup: F) -> ApiConfig
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(origin) = get(ENV_ALLOWED_ORIGIN) {
        config.cors.allowed_origin = origin;
    }
    if let Some(secret_id) = get(ENV_SECRET_ID) {
        config.secrets.secret_id = Some(secret_id);
    }
    if let Some(table) = get(ENV_TABLE_NAME) {
        config.store.table_name = Some(table);
    }
    if let Some(index) = get(ENV_STATUS_INDEX) {
        config.store.status_index = index;
    }

    config
}
