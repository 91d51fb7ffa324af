//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by route and status
//! - `gateway_request_duration_seconds` (histogram): latency by route
//! - `gateway_backend_health` (gauge): 1=running, 0=otherwise
//! - `gateway_circuit_transitions_total` (counter): breaker transitions by backend and target state
//! - `gateway_cache_fallbacks_total` (counter): responses served from the cache
//!
//! Without an installed recorder every call is a no-op, so library code and
//! tests record unconditionally.

use std::net::SocketAddr;
use std::time::Instant;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(route: &'static str, status: u16, start: Instant) {
    counter!("gateway_requests_total", "route" => route, "status" => status.to_string()).increment(1);
    histogram!("gateway_request_duration_seconds", "route" => route).record(start.elapsed().as_secs_f64());
}

pub fn record_backend_health(backend: &str, running: bool) {
    gauge!("gateway_backend_health", "backend" => backend.to_string()).set(if running { 1.0 } else { 0.0 });
}

pub fn record_circuit_transition(backend: &str, state: &'static str) {
    counter!("gateway_circuit_transitions_total", "backend" => backend.to_string(), "state" => state).increment(1);
}

pub fn record_cache_fallback() {
    counter!("gateway_cache_fallbacks_total").increment(1);
}
