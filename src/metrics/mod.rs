//! # Metrics Module
//!
//! Prometheus counters for the procurement lifecycle, exposed in text format
//! at `/metrics`. Transaction and pool figures recorded through the `metrics`
//! facade are only visible when a recorder is installed.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, TextEncoder};
use tracing::error;

lazy_static! {
    pub static ref PO_CREATIONS: IntCounter = register(IntCounter::new(
        "lifecycle_po_creations_total",
        "Total number of purchase orders created"
    )
    .expect("metric can be created"));
    pub static ref PO_CREATION_FAILURES: IntCounterVec = register(IntCounterVec::new(
        Opts::new(
            "lifecycle_po_creation_failures_total",
            "Total number of failed purchase order creations"
        ),
        &["error_type"]
    )
    .expect("metric can be created"));
    pub static ref ROLLUP_WRITES: IntCounterVec = register(IntCounterVec::new(
        Opts::new(
            "lifecycle_rollup_writes_total",
            "Status changes written by the rollup engine"
        ),
        &["entity"]
    )
    .expect("metric can be created"));
    pub static ref ROLLUP_FAILURES: IntCounterVec = register(IntCounterVec::new(
        Opts::new(
            "lifecycle_rollup_failures_total",
            "Rollups that failed after the triggering write committed"
        ),
        &["entity"]
    )
    .expect("metric can be created"));
    pub static ref RECONCILIATION_RUNS: IntCounter = register(IntCounter::new(
        "lifecycle_reconciliation_runs_total",
        "Completed reconciliation sweeps"
    )
    .expect("metric can be created"));
}

fn register<C>(collector: C) -> C
where
    C: prometheus::core::Collector + Clone + 'static,
{
    if let Err(e) = prometheus::register(Box::new(collector.clone())) {
        error!("Failed to register metric: {}", e);
    }
    collector
}

/// Renders every registered collector in Prometheus text format.
pub fn gather_text() -> Result<String, prometheus::Error> {
    // Touch the lazies so they show up before their first increment.
    lazy_static::initialize(&PO_CREATIONS);
    lazy_static::initialize(&PO_CREATION_FAILURES);
    lazy_static::initialize(&ROLLUP_WRITES);
    lazy_static::initialize(&ROLLUP_FAILURES);
    lazy_static::initialize(&RECONCILIATION_RUNS);

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&prometheus::gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

// HTTP endpoint handler for metrics
pub async fn metrics_handler() -> Response {
    match gather_text() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to export metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exported_text_lists_lifecycle_counters() {
        PO_CREATIONS.inc();
        ROLLUP_WRITES.with_label_values(&["tender"]).inc();
        let text = gather_text().unwrap();
        assert!(text.contains("lifecycle_po_creations_total"));
        assert!(text.contains("lifecycle_rollup_writes_total{entity=\"tender\"}"));
        assert!(text.contains("lifecycle_reconciliation_runs_total"));
    }
}
