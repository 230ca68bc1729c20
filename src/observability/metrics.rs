//! Metrics collection and exposition.
//!
//! # Metrics
//! - `api_requests_total` (counter): requests by route, status
//! - `api_request_duration_seconds` (histogram): latency by route
//! - `api_auth_failures_total` (counter): rejected credentials
//! - `api_rate_limited_total` (counter): requests over the window limit
//! - `api_secret_fetches_total` (counter): secret backend calls by outcome
//! - `api_status_index_fallbacks_total` (counter): pending lookups served by scan
//!
//! Recording is a no-op until an exporter is installed.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(route: &'static str, status: u16, start: Instant) {
    counter!("api_requests_total", "route" => route, "status" => status.to_string()).increment(1);
    histogram!("api_request_duration_seconds", "route" => route)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_auth_failure() {
    counter!("api_auth_failures_total").increment(1);
}

pub fn record_rate_limited() {
    counter!("api_rate_limited_total").increment(1);
}

pub fn record_secret_fetch(outcome: &'static str) {
    counter!("api_secret_fetches_total", "outcome" => outcome).increment(1);
}

pub fn record_index_fallback() {
    counter!("api_status_index_fallbacks_total").increment(1);
}
