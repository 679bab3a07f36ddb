//! Metrics collection and exposition.
//!
//! # Metrics
//! - `codecritter_attempts_total` (counter): attempts by category
//! - `codecritter_retries_total` (counter): attempts after the first, by category
//! - `codecritter_calls_total` (counter): logical calls by category, outcome
//! - `codecritter_call_duration_seconds` (histogram): logical call latency
//! - `codecritter_breaker_opened_total` (counter): closed → open transitions
//! - `codecritter_breaker_open` (gauge): 1=open, 0=closed
//!
//! Without an installed recorder every call here is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_attempt(category: &str) {
    counter!("codecritter_attempts_total", "category" => category.to_string()).increment(1);
}

pub fn record_retry(category: &str) {
    counter!("codecritter_retries_total", "category" => category.to_string()).increment(1);
}

/// Record one logical call. `outcome` is "success", "failure" or "rejected".
pub fn record_call(category: &str, outcome: &'static str, start: Instant) {
    counter!(
        "codecritter_calls_total",
        "category" => category.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!("codecritter_call_duration_seconds", "category" => category.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_breaker_opened(category: &str) {
    counter!("codecritter_breaker_opened_total", "category" => category.to_string()).increment(1);
}

pub fn set_breaker_open(category: &str, open: bool) {
    gauge!("codecritter_breaker_open", "category" => category.to_string()).set(if open { 1.0 } else { 0.0 });
}
