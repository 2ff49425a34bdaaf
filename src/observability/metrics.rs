//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define balancer metrics (sessions, bytes, backend reachability)
//! - Expose Prometheus-compatible metrics endpoint
//! - Track per-backend and aggregate metrics
//!
//! # Metrics
//! - `balancer_sessions_total` (counter): finished sessions by outcome
//! - `balancer_active_sessions` (gauge): sessions currently relaying
//! - `balancer_bytes_total` (counter): relayed bytes by direction
//! - `balancer_backend_up` (gauge): 1=reachable, 0=absent, per backend
//! - `balancer_live_backends` (gauge): size of the published live set
//! - `balancer_probe_cycles_total` (counter): probe cycles by result
//!
//! Recording is a no-op until a recorder is installed, so tests and
//! metrics-disabled deployments pay nothing.

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record how a session ended (`relayed`, `no_backend`, `connect_failed`, ...).
pub fn record_session(outcome: &'static str) {
    counter!("balancer_sessions_total", "outcome" => outcome).increment(1);
}

pub fn session_started() {
    gauge!("balancer_active_sessions").increment(1.0);
}

pub fn session_finished() {
    gauge!("balancer_active_sessions").decrement(1.0);
}

/// Record relayed bytes for one direction (`upstream` or `downstream`).
pub fn record_bytes(direction: &'static str, bytes: u64) {
    counter!("balancer_bytes_total", "direction" => direction).increment(bytes);
}

pub fn record_backend_up(backend: &str, up: bool) {
    gauge!("balancer_backend_up", "backend" => backend.to_string()).set(if up { 1.0 } else { 0.0 });
}

pub fn record_probe_cycle(published: bool, live_backends: usize) {
    let result = if published { "published" } else { "discarded" };
    counter!("balancer_probe_cycles_total", "result" => result).increment(1);
    if published {
        gauge!("balancer_live_backends").set(live_backends as f64);
    }
}
