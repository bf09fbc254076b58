//! Prometheus metrics for the collector

use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, register_histogram_vec, Counter,
    CounterVec, Encoder, Gauge, HistogramVec, TextEncoder,
};

// ── Ingestion ────────────────────────────────────────────────────────────────

pub static INGEST_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "perfkit_ingest_total",
        "Profiles received for ingestion",
        &["kind", "status"]
    )
    .unwrap()
});

pub static INGEST_BYTES: Lazy<Counter> = Lazy::new(|| {
    register_counter!("perfkit_ingest_bytes_total", "Bytes of accepted uploads").unwrap()
});

pub static INGEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "perfkit_ingest_duration_seconds",
        "Decode and extraction latency",
        &["source"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
    )
    .unwrap()
});

// ── Comparison ───────────────────────────────────────────────────────────────

pub static COMPARE_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "perfkit_compare_total",
        "Comparison requests",
        &["status"]
    )
    .unwrap()
});

// ── Store ────────────────────────────────────────────────────────────────────

pub static STORED_PROFILES: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "perfkit_stored_profiles",
        "Current number of profiles in the in-memory store"
    )
    .unwrap()
});

pub static STORE_DROPS: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "perfkit_store_drops_total",
        "Profiles dropped from the store due to capacity"
    )
    .unwrap()
});

/// Render all registered metrics to Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&families, &mut buffer) {
        tracing::warn!("metrics encoding failed: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_contains_registered_metrics() {
        INGEST_TOTAL.with_label_values(&["cpu", "ok"]).inc();
        COMPARE_TOTAL.with_label_values(&["ok"]).inc();
        let text = encode_metrics();
        assert!(text.contains("perfkit_ingest_total"));
        assert!(text.contains("perfkit_compare_total"));
    }
}
