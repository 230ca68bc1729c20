//! TTL cache in front of the secret source.
//!
//! # Responsibilities
//! - Serve the expected API key without contacting the backend while fresh
//! - Refetch once the TTL has elapsed
//! - Keep a previously cached value when a refetch fails
//!
//! # Design Decisions
//! - The cached entry is immutable and swapped as a whole (`ArcSwapOption`)
//! - Refreshes are serialized so concurrent callers after expiry share one fetch
//! - Blank keys are returned but never cached

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::observability::metrics;
use crate::secrets::{SecretError, SecretSource};

/// A fetched key and the instant after which it must be refetched.
#[derive(Debug, Clone)]
pub struct CachedSecret {
    pub value: String,
    pub expires_at: Instant,
}

/// Process-wide cache of the expected API key.
pub struct SecretCache {
    source: Arc<dyn SecretSource>,
    secret_id: Option<String>,
    ttl: Duration,
    current: ArcSwapOption<CachedSecret>,
    refresh: Mutex<()>,
}

impl SecretCache {
    pub fn new(source: Arc<dyn SecretSource>, secret_id: Option<String>, ttl: Duration) -> Self {
        Self {
            source,
            secret_id,
            ttl,
            current: ArcSwapOption::empty(),
            refresh: Mutex::new(()),
        }
    }

    /// Return the expected API key, fetching it when the cache is empty or stale.
    pub async fn get_key(&self) -> Result<String, SecretError> {
        if let Some(value) = self.fresh(Instant::now()) {
            return Ok(value);
        }

        let _guard = self.refresh.lock().await;
        let now = Instant::now();
        // another caller may have refreshed while we waited
        if let Some(value) = self.fresh(now) {
            return Ok(value);
        }

        let secret_id = self.secret_id.as_deref().ok_or(SecretError::NotConfigured)?;
        let payload = match self.source.get_secret(secret_id).await {
            Ok(payload) => {
                metrics::record_secret_fetch("ok");
                payload
            }
            Err(e) => {
                metrics::record_secret_fetch("error");
                return Err(e);
            }
        };

        let value = payload.api_key.unwrap_or_default();
        if !value.is_empty() {
            self.current.store(Some(Arc::new(CachedSecret {
                value: value.clone(),
                expires_at: now + self.ttl,
            })));
            tracing::debug!(ttl_secs = self.ttl.as_secs(), "API key cached");
        }

        Ok(value)
    }

    /// Snapshot of the cached entry, fresh or not.
    pub fn cached(&self) -> Option<Arc<CachedSecret>> {
        self.current.load_full()
    }

    fn fresh(&self, now: Instant) -> Option<String> {
        self.current
            .load_full()
            .filter(|entry| now < entry.expires_at)
            .map(|entry| entry.value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::SecretPayload;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingSource {
        key: Option<String>,
        failing: AtomicBool,
        fetches: AtomicUsize,
        latency: Duration,
    }

    impl CountingSource {
        fn with_key(key: &str) -> Self {
            Self {
                key: Some(key.to_string()),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl SecretSource for CountingSource {
        async fn get_secret(&self, _id: &str) -> Result<SecretPayload, SecretError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            if self.failing.load(Ordering::SeqCst) {
                return Err(SecretError::Fetch("backend unavailable".into()));
            }
            Ok(SecretPayload {
                api_key: self.key.clone(),
            })
        }
    }

    fn cache_for(source: Arc<CountingSource>) -> SecretCache {
        SecretCache::new(source, Some("api-key".into()), Duration::from_secs(300))
    }

    #[tokio::test(start_paused = true)]
    async fn test_serves_from_cache_within_ttl() {
        let source = Arc::new(CountingSource::with_key("secret-key"));
        let cache = cache_for(source.clone());

        assert_eq!(cache.get_key().await.unwrap(), "secret-key");
        tokio::time::advance(Duration::from_secs(299)).await;
        assert_eq!(cache.get_key().await.unwrap(), "secret-key");

        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refetches_once_after_ttl() {
        let source = Arc::new(CountingSource::with_key("secret-key"));
        let cache = cache_for(source.clone());

        cache.get_key().await.unwrap();
        tokio::time::advance(Duration::from_secs(301)).await;
        cache.get_key().await.unwrap();
        cache.get_key().await.unwrap();

        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_is_exclusive() {
        let source = Arc::new(CountingSource::with_key("secret-key"));
        let cache = cache_for(source.clone());

        cache.get_key().await.unwrap();
        tokio::time::advance(Duration::from_secs(300)).await;
        cache.get_key().await.unwrap();

        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_one_refresh() {
        let source = Arc::new(CountingSource {
            latency: Duration::from_millis(200),
            ..CountingSource::with_key("secret-key")
        });
        let cache = cache_for(source.clone());

        cache.get_key().await.unwrap();
        tokio::time::advance(Duration::from_secs(301)).await;

        let (a, b) = tokio::join!(cache.get_key(), cache.get_key());
        assert_eq!(a.unwrap(), "secret-key");
        assert_eq!(b.unwrap(), "secret-key");
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_missing_secret_id() {
        let source = Arc::new(CountingSource::with_key("secret-key"));
        let cache = SecretCache::new(source.clone(), None, Duration::from_secs(300));

        assert!(matches!(cache.get_key().await, Err(SecretError::NotConfigured)));
        assert_eq!(source.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_keeps_previous_entry() {
        let source = Arc::new(CountingSource::with_key("secret-key"));
        let cache = cache_for(source.clone());

        cache.get_key().await.unwrap();
        let before = cache.cached().unwrap();

        tokio::time::advance(Duration::from_secs(301)).await;
        source.failing.store(true, Ordering::SeqCst);
        assert!(matches!(cache.get_key().await, Err(SecretError::Fetch(_))));

        let after = cache.cached().unwrap();
        assert!(Arc::ptr_eq(&before, &after));
    }

    #[tokio::test]
    async fn test_blank_key_not_cached() {
        let source = Arc::new(CountingSource::default());
        let cache = cache_for(source.clone());

        assert_eq!(cache.get_key().await.unwrap(), "");
        assert_eq!(cache.get_key().await.unwrap(), "");
        assert!(cache.cached().is_none());
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    }
}
