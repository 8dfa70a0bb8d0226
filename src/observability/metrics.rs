//! Metrics collection and exposition.
//!
//! # Metrics
//! - `api_requests_total` (counter): requests by method, route, status
//! - `api_request_duration_seconds` (histogram): latency by method, route
//! - `api_rejections_total` (counter): rejections by stage (`body`, `context`,
//!   `group`, `handler`) and status
//! - `api_panics_total` (counter): requests that ended in a recovered panic
//!
//! # Design Decisions
//! - Route label is the registered pattern, never the raw path, to keep
//!   cardinality bounded

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Start the Prometheus exporter on `addr`. Failures are logged; the server
/// keeps running without metrics exposition.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a completed request.
pub fn record_request(method: &str, route: &str, status: u16, start: Instant) {
    metrics::counter!(
        "api_requests_total",
        "method" => method.to_string(),
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    metrics::histogram!(
        "api_request_duration_seconds",
        "method" => method.to_string(),
        "route" => route.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record a rejection returned by a middleware or handler.
pub fn record_rejection(stage: &'static str, status: u16) {
    metrics::counter!("api_rejections_total", "stage" => stage, "status" => status.to_string())
        .increment(1);
}

/// Record a recovered panic.
pub fn record_panic() {
    metrics::counter!("api_panics_total").increment(1);
}
