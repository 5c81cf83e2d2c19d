//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, route
//! - `gateway_request_duration_seconds` (histogram): latency by route
//! - `gateway_rate_limited_total` (counter): denials by scope (http/raw)
//! - `gateway_forward_bytes_total` (counter): bytes moved per raw forward
//! - `gateway_forward_duration_seconds` (histogram): raw connection lifetime
//!
//! # Design Decisions
//! - Prometheus exposition on its own listener, scrape-friendly
//! - Label cardinality kept to configured route/forward names plus status

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP exposition listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one proxied HTTP request.
pub fn record_request(method: &str, status: u16, route: &str, start: Instant) {
    counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "route" => route.to_string(),
    )
    .increment(1);
    histogram!(
        "gateway_request_duration_seconds",
        "route" => route.to_string(),
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record one denied request or connection.
pub fn record_rate_limited(scope: &'static str) {
    counter!("gateway_rate_limited_total", "scope" => scope).increment(1);
}

/// Record one completed raw TCP forward.
pub fn record_forward(forward: &str, bytes: u64, start: Instant) {
    counter!(
        "gateway_forward_bytes_total",
        "forward" => forward.to_string(),
    )
    .increment(bytes);
    histogram!(
        "gateway_forward_duration_seconds",
        "forward" => forward.to_string(),
    )
    .record(start.elapsed().as_secs_f64());
}
