//! Metrics collection and exposition.
//!
//! # Metrics
//! - `configmap_reloads_total` (counter): reloads by event kind
//! - `configmap_keys` (gauge): keys in the accepted snapshot
//! - `configmap_updates_skipped_total` (counter): incompatible values kept back
//! - `configmap_watch_failures_total` (counter): watch failures by reason
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - The Prometheus endpoint is optional and installed by the binary

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_reload(event: &'static str, keys: usize) {
    metrics::counter!("configmap_reloads_total", "event" => event).increment(1);
    metrics::gauge!("configmap_keys").set(keys as f64);
}

pub fn record_updates_skipped(count: usize) {
    if count > 0 {
        metrics::counter!("configmap_updates_skipped_total").increment(count as u64);
    }
}

pub fn record_watch_failure(reason: &'static str) {
    metrics::counter!("configmap_watch_failures_total", "reason" => reason).increment(1);
}
