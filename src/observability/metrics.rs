//! Metrics collection and exposition.
//!
//! # Metrics
//! - `balancer_pinned_changes_total` (counter): pin moved to another address, by target
//! - `balancer_failures_witnessed_total` (counter): failures recorded, by target
//! - `balancer_ready_candidates` (gauge): ready connections, by target
//! - `balancer_rebalances_total` (counter): rebalances, by target
//! - `balancer_unavailable_total` (counter): picks with nothing pinned, by target
//! - `retry_calls_total` (counter): finished wrapped calls, by outcome
//! - `retry_attempts` (histogram): attempts used per wrapped call

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_pinned_change(target: &str) {
    metrics::counter!("balancer_pinned_changes_total", "target" => target.to_string()).increment(1);
}

pub fn record_failure_witnessed(target: &str) {
    metrics::counter!("balancer_failures_witnessed_total", "target" => target.to_string())
        .increment(1);
}

pub fn record_ready_candidates(target: &str, count: usize) {
    metrics::gauge!("balancer_ready_candidates", "target" => target.to_string()).set(count as f64);
}

pub fn record_rebalance(target: &str) {
    metrics::counter!("balancer_rebalances_total", "target" => target.to_string()).increment(1);
}

pub fn record_unavailable(target: &str) {
    metrics::counter!("balancer_unavailable_total", "target" => target.to_string()).increment(1);
}

/// Record how a retry-wrapped call finished and how many attempts it took.
pub fn record_retry_outcome(outcome: &'static str, attempts: u32) {
    metrics::counter!("retry_calls_total", "outcome" => outcome).increment(1);
    metrics::histogram!("retry_attempts").record(attempts as f64);
}
