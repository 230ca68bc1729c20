//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Provide the `audit!` macro for security/compliance events
//! - Configure log level at runtime
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - Audit events are `info` events on the `audit` target so they can be
//!   filtered and shipped separately
//! - `RUST_LOG` overrides the configured level

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};

/// Target carried by every audit event.
pub const AUDIT_TARGET: &str = "audit";

/// Emit an audit-level event (auth failures, every dispatched route).
#[macro_export]
macro_rules! audit {
    ($($arg:tt)+) => {
        ::tracing::info!(target: $crate::observability::logging::AUDIT_TARGET, $($arg)+)
    };
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(
    config: &ObservabilityConfig,
) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},tower_http=warn", config.log_level)));

    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(false),
            )
            .try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    }
}
