//! Environment-based secret source.
//!
//! Reads the secret document from an environment variable. Useful for local
//! development and containerized deployments where secrets are injected via
//! environment.

use async_trait::async_trait;
use tracing::debug;

use super::{SecretError, SecretPayload, SecretSource};

/// Secret source where the id is the name of an environment variable holding
/// `{"apiKey": "..."}`.
#[derive(Debug, Clone, Default)]
pub struct EnvSecretSource;

impl EnvSecretSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SecretSource for EnvSecretSource {
    async fn get_secret(&self, id: &str) -> Result<SecretPayload, SecretError> {
        match std::env::var(id) {
            Ok(raw) => {
                debug!(env_var = %id, "Retrieved secret from environment variable");
                SecretPayload::from_json(&raw)
            }
            Err(std::env::VarError::NotPresent) => Err(SecretError::Fetch(format!(
                "environment variable {id} is not set"
            ))),
            Err(std::env::VarError::NotUnicode(_)) => Err(SecretError::Malformed(format!(
                "environment variable {id} is not valid UTF-8"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_variable() {
        let source = EnvSecretSource::new();
        let err = source
            .get_secret("RESPONSES_API_TEST_SECRET_THAT_IS_NEVER_SET")
            .await
            .unwrap_err();
        assert!(matches!(err, SecretError::Fetch(_)));
    }
}
