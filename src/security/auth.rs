//! API key validation.
//!
//! Compares the presented `x-api-key` against the cached secret in constant
//! time. Every failure mode collapses to `false`: the caller cannot tell a bad
//! key from a misconfigured or unreachable secret backend.

use std::sync::Arc;

use subtle::ConstantTimeEq;

use crate::security::secret_cache::SecretCache;

/// Validates presented credentials against the expected API key.
pub struct Authenticator {
    secrets: Arc<SecretCache>,
}

impl Authenticator {
    pub fn new(secrets: Arc<SecretCache>) -> Self {
        Self { secrets }
    }

    /// Returns true only when `provided` byte-equals the current expected key.
    pub async fn validate(&self, provided: &str) -> bool {
        if provided.is_empty() {
            return false;
        }

        let expected = match self.secrets.get_key().await {
            Ok(key) => key,
            Err(e) => {
                tracing::error!(error = %e, "Failed to validate API key");
                return false;
            }
        };

        if expected.is_empty() {
            return false;
        }

        keys_match(provided.as_bytes(), expected.as_bytes())
    }
}

/// Equal-time comparison over the whole input; only a length mismatch returns early.
pub fn keys_match(provided: &[u8], expected: &[u8]) -> bool {
    provided.ct_eq(expected).into()
}
