//! Fixed-window rate limiting keyed by credential prefix.
//!
//! Each bucket counts requests in a window that starts at the bucket's first
//! request. The counter is incremented before the admission check, so
//! rejected requests still count toward the current window.

use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use crate::config::RateLimitConfig;

/// Bucket key used when no credential was presented.
pub const UNKNOWN_BUCKET: &str = "unknown";

/// Loggable form of a credential. Shows at most four leading characters and
/// never more than half of the key.
pub fn masked_credential(credential: &str) -> String {
    if credential.is_empty() {
        return UNKNOWN_BUCKET.to_string();
    }
    let shown = (credential.chars().count() / 2).min(4);
    let prefix: String = credential.chars().take(shown).collect();
    format!("{prefix}...")
}

/// Requests counted in the current window of one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateWindow {
    pub count: u32,
    pub reset_at: Instant,
}

/// In-memory per-bucket window table. Never persisted.
pub struct RateLimiter {
    windows: DashMap<String, RateWindow>,
    max_requests: u32,
    window: Duration,
    key_prefix_len: usize,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            windows: DashMap::new(),
            max_requests: config.max_requests,
            window: Duration::from_secs(config.window_secs),
            key_prefix_len: config.key_prefix_len,
        }
    }

    /// Bucket a credential by its leading characters.
    pub fn bucket_key(&self, credential: &str) -> String {
        if credential.is_empty() {
            UNKNOWN_BUCKET.to_string()
        } else {
            credential.chars().take(self.key_prefix_len).collect()
        }
    }

    /// Count one request for `credential` and report whether it is admitted.
    pub fn allow(&self, credential: &str) -> bool {
        self.allow_at(credential, Instant::now())
    }

    pub(crate) fn allow_at(&self, credential: &str, now: Instant) -> bool {
        let mut window = self
            .windows
            .entry(self.bucket_key(credential))
            .or_insert_with(|| RateWindow {
                count: 0,
                reset_at: now + self.window,
            });

        // strict: a window whose reset_at equals now is still live
        if window.reset_at < now {
            *window = RateWindow {
                count: 1,
                reset_at: now + self.window,
            };
        } else {
            window.count = window.count.saturating_add(1);
        }

        window.count <= self.max_requests
    }

    /// Current window for a bucket key, if one exists.
    pub fn window(&self, bucket: &str) -> Option<RateWindow> {
        self.windows.get(bucket).map(|w| *w)
    }
}
