//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (after health/preflight bypass):
//!     → auth.rs (constant-time API key check)
//!         → secret_cache.rs (TTL cached expected key)
//!     → rate_limit.rs (fixed window per credential prefix)
//!     → Pass to routing
//! ```
//!
//! # Design Decisions
//! - Fail closed: any secret failure rejects the request
//! - Rate limiting runs only for authenticated callers
//! - Never log a full credential

pub mod auth;
pub mod rate_limit;
pub mod secret_cache;

pub use auth::Authenticator;
pub use rate_limit::RateLimiter;
pub use secret_cache::SecretCache;
