//! Metrics collection and exposition.
//!
//! # Metrics
//! - `unsubscribe_outcomes_total` (counter): workflow outcomes by label
//! - `unsubscribe_rate_limited_total` (counter): requests rejected by the limiter
//! - `unsubscribe_storage_failures_total` (counter): storage faults by operation
//! - `unsubscribe_request_duration_seconds` (histogram): handler latency by status

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

/// Start the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_outcome(outcome: &'static str) {
    counter!("unsubscribe_outcomes_total", "outcome" => outcome).increment(1);
}

pub fn record_rate_limited() {
    counter!("unsubscribe_rate_limited_total").increment(1);
}

pub fn record_storage_failure(operation: &'static str) {
    counter!("unsubscribe_storage_failures_total", "operation" => operation).increment(1);
}

pub fn record_request_duration(status: u16, start: Instant) {
    histogram!("unsubscribe_request_duration_seconds", "status" => status.to_string())
        .record(start.elapsed().as_secs_f64());
}
