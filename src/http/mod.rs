//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → request.rs (method, path, case-insensitive headers)
//!     → dispatch.rs (timeout, health / preflight / auth / rate limit / route)
//!     → handlers.rs (record store access, projections)
//!     → response.rs (CORS headers, JSON envelope)
//!     → Send to client
//! ```

pub mod dispatch;
pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use dispatch::Dispatcher;
pub use request::{ApiRequest, Headers, API_KEY_HEADER};
pub use response::{ApiResponse, CorsHeaders};
pub use server::ApiServer;
