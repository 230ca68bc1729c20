//! File-based secret source (mounted secrets, e.g. `/run/secrets/...`).

use async_trait::async_trait;

use super::{SecretError, SecretPayload, SecretSource};

/// Secret source where the id is a path to a JSON secret document.
#[derive(Debug, Clone, Default)]
pub struct FileSecretSource;

impl FileSecretSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SecretSource for FileSecretSource {
    async fn get_secret(&self, id: &str) -> Result<SecretPayload, SecretError> {
        let raw = tokio::fs::read_to_string(id)
            .await
            .map_err(|e| SecretError::Fetch(format!("reading {id}: {e}")))?;
        SecretPayload::from_json(&raw)
    }
}
