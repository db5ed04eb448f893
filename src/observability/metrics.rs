//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_proxy_requests_total` (counter): outbound calls by method, outcome
//! - `relay_proxy_request_duration_seconds` (histogram): outbound latency by method
//! - `relay_proxy_cache_hits_total` (counter): responses served from cache
//! - `relay_circuit_rejections_total` (counter): calls refused by the open breaker
//! - `relay_http_requests_total` (counter): inbound requests by route, status
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - The Prometheus listener is only started when enabled in config

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record one finished outbound call.
pub fn record_proxy_request(method: &str, outcome: &str, started: Instant) {
    metrics::counter!(
        "relay_proxy_requests_total",
        "method" => method.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
    metrics::histogram!(
        "relay_proxy_request_duration_seconds",
        "method" => method.to_string()
    )
    .record(started.elapsed().as_secs_f64());
}

pub fn record_cache_hit() {
    metrics::counter!("relay_proxy_cache_hits_total").increment(1);
}

pub fn record_circuit_rejection() {
    metrics::counter!("relay_circuit_rejections_total").increment(1);
}

/// Record one inbound HTTP request.
pub fn record_http_request(route: &str, status: u16) {
    metrics::counter!(
        "relay_http_requests_total",
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}
