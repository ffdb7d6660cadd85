//! Metrics collection and exposition.
//!
//! # Metrics
//! - `rotator_refresh_total` (counter): refresh outcomes by `outcome`
//!   (`success`, `failure`, `skipped`, `break`)
//! - `rotator_passes_total` (counter): completed passes by `kind`
//! - `rotator_refreshed_per_pass` (histogram): refreshed entities per pass
//! - `rotator_quarantined_entities` (gauge): currently quarantined entities
//! - `rotator_activity_log_entries` (gauge): activity journal length
//! - `rotator_state_saves_total` (counter): snapshot saves by `result`

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_refresh(outcome: &'static str) {
    metrics::counter!("rotator_refresh_total", "outcome" => outcome).increment(1);
}

pub fn record_pass(kind: &'static str, refreshed: usize) {
    metrics::counter!("rotator_passes_total", "kind" => kind).increment(1);
    metrics::histogram!("rotator_refreshed_per_pass", "kind" => kind).record(refreshed as f64);
}

pub fn record_quarantined(count: usize) {
    metrics::gauge!("rotator_quarantined_entities").set(count as f64);
}

pub fn record_activity_log_size(len: usize) {
    metrics::gauge!("rotator_activity_log_entries").set(len as f64);
}

pub fn record_save(result: &'static str) {
    metrics::counter!("rotator_state_saves_total", "result" => result).increment(1);
}
