//! Prometheus metrics for proxy observability.
//!
//! Metrics are exposed via a dedicated HTTP listener when `METRICS_PORT` is
//! non-zero. Without an installed recorder every `record_*` call is a no-op,
//! so the pipeline records unconditionally.
//!
//! # Available Metrics
//!
//! ## Counters
//! - `proxy_requests_total` - Requests by pipeline outcome (label: outcome)
//! - `proxy_upstream_errors_total` - Upstream transport failures (label: kind)
//!
//! ## Histograms
//! - `proxy_upstream_duration_seconds` - Time until upstream response headers (label: status)
//!
//! # Outcomes
//!
//! `preflight`, `unauthorized`, `forbidden`, `index`, `forwarded`, `upstream_error`

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::info;

/// Metric names as constants for consistency.
pub mod names {
    pub const REQUESTS_TOTAL: &str = "proxy_requests_total";
    pub const UPSTREAM_ERRORS_TOTAL: &str = "proxy_upstream_errors_total";
    pub const UPSTREAM_DURATION_SECONDS: &str = "proxy_upstream_duration_seconds";
}

/// Pipeline outcome labels.
pub mod outcome {
    pub const PREFLIGHT: &str = "preflight";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const FORBIDDEN: &str = "forbidden";
    pub const INDEX: &str = "index";
    pub const FORWARDED: &str = "forwarded";
    pub const UPSTREAM_ERROR: &str = "upstream_error";
}

/// Initialize the Prometheus metrics exporter.
///
/// # Arguments
///
/// * `metrics_addr` - Address for the Prometheus metrics endpoint
///
/// # Returns
///
/// `Ok(())` if initialization succeeds, `Err` with message otherwise.
pub fn init_metrics(metrics_addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        names::REQUESTS_TOTAL,
        "Total number of requests handled, by pipeline outcome"
    );
    describe_counter!(
        names::UPSTREAM_ERRORS_TOTAL,
        "Total number of failed upstream requests, by failure kind"
    );
    describe_histogram!(
        names::UPSTREAM_DURATION_SECONDS,
        "Time from sending the upstream request to receiving response headers"
    );

    info!(addr = %metrics_addr, "Prometheus metrics endpoint started");
    Ok(())
}

/// Record the outcome of one request.
#[inline]
pub fn record_request(outcome: &'static str) {
    counter!(names::REQUESTS_TOTAL, "outcome" => outcome).increment(1);
}

/// Record time-to-headers for a successful upstream exchange.
#[inline]
pub fn record_upstream_duration(status: u16, duration_secs: f64) {
    histogram!(names::UPSTREAM_DURATION_SECONDS, "status" => status.to_string())
        .record(duration_secs);
}

/// Record an upstream transport failure, classified by kind.
pub fn record_upstream_error(error: &reqwest::Error) {
    counter!(names::UPSTREAM_ERRORS_TOTAL, "kind" => upstream_error_kind(error)).increment(1);
}

fn upstream_error_kind(error: &reqwest::Error) -> &'static str {
    if error.is_timeout() {
        "timeout"
    } else if error.is_connect() {
        "connect"
    } else {
        "other"
    }
}
