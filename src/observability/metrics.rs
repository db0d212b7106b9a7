//! Metrics collection and exposition.
//!
//! # Metrics
//! - `mux_requests_total` (counter): dispatched requests by method, status
//! - `mux_request_duration_seconds` (histogram): latency distribution
//! - `mux_routes` (gauge): number of registered agent routes
//!
//! # Design Decisions
//! - Recording without an installed recorder is a no-op, so tests need no setup
//! - Labels stay low-cardinality (no path, no agent segment)

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a completed request.
pub fn record_request(method: &str, status: u16, start: Instant) {
    let method = method.to_string();
    let status = status.to_string();
    metrics::counter!("mux_requests_total", "method" => method.clone(), "status" => status.clone())
        .increment(1);
    metrics::histogram!("mux_request_duration_seconds", "method" => method, "status" => status)
        .record(start.elapsed().as_secs_f64());
}

/// Publish the current route count.
pub fn record_route_count(count: usize) {
    metrics::gauge!("mux_routes").set(count as f64);
}
