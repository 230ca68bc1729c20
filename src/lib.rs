//! Authenticated HTTP API over questionnaire response records.
//!
//! Every request runs through one dispatcher: health checks and CORS
//! preflight are answered directly, everything else is authenticated against
//! a cached API key, rate limited per credential prefix, routed, and handled
//! against the record store.

// Core subsystems
pub mod config;
pub mod error;
pub mod http;
pub mod routing;
pub mod store;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod secrets;
pub mod security;

pub use config::schema::ApiConfig;
pub use http::{ApiServer, Dispatcher};
pub use lifecycle::Shutdown;
