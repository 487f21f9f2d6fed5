//! Metrics collection and Prometheus export.
//!
//! Initializes the metrics exporter and provides the /metrics endpoint handler.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

/// Global handle to the Prometheus recorder.
pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the metrics recorder.
///
/// Call once at startup before any metrics are recorded. Later calls are no-ops.
pub fn init_metrics() {
    if METRICS_HANDLE.get().is_some() {
        return;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            let _ = METRICS_HANDLE.set(handle);
        }
        Err(e) => tracing::warn!(error = %e, "Prometheus recorder not installed"),
    }
}

/// Get the current metrics in Prometheus text format.
///
/// Returns a string suitable for the /metrics HTTP endpoint.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized".to_string())
}

pub fn record_store_query(collection: &str, outcome: &'static str, elapsed: Duration) {
    let labels = [
        ("collection", collection.to_string()),
        ("outcome", outcome.to_string()),
    ];
    metrics::counter!("store_queries_total", &labels).increment(1);
    metrics::histogram!("store_query_duration_seconds", &labels).record(elapsed.as_secs_f64());
}

pub fn record_request_charge(collection: &str, charge: f64) {
    metrics::histogram!("store_request_charge", "collection" => collection.to_string())
        .record(charge);
}

pub fn record_composite(outcome: &'static str) {
    metrics::counter!("composite_requests_total", "outcome" => outcome).increment(1);
}
