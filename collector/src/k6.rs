//! k6 load-test summary extraction
//!
//! Accepts both the `handleSummary` JSON (stats under each metric's
//! `values`) and the `--summary-export` JSON (stats directly on the metric).
//! Metrics missing from the document leave their fields `None`.

use perfkit_shared::K6Metrics;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
#[error("parse k6 json: {0}")]
pub struct K6ParseError(#[from] serde_json::Error);

#[derive(Debug, Deserialize)]
struct Summary {
    #[serde(default)]
    metrics: HashMap<String, Value>,
    #[serde(default)]
    root_group: Option<RootGroup>,
    #[serde(default)]
    state: Option<State>,
}

#[derive(Debug, Deserialize)]
struct RootGroup {
    duration: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct State {
    test_run_duration_ms: Option<f64>,
}

/// Parsed k6 summary.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedK6 {
    pub metrics: K6Metrics,
    pub duration_ms: Option<i64>,
}

/// Stat map of one named metric.
struct Stats<'a>(Option<&'a Map<String, Value>>);

impl<'a> Stats<'a> {
    fn of(summary: &'a Summary, metric: &str) -> Self {
        let stats = summary.metrics.get(metric).and_then(|m| {
            m.get("values")
                .and_then(Value::as_object)
                .or_else(|| m.as_object())
        });
        Stats(stats)
    }

    fn float(&self, field: &str) -> Option<f64> {
        self.0?.get(field)?.as_f64()
    }

    fn count(&self, field: &str) -> Option<i64> {
        self.float(field).map(|v| v as i64)
    }
}

/// Extract the fixed k6 metrics record from a summary document.
///
/// Malformed JSON is the only failure.
pub fn extract_k6_summary(data: &[u8]) -> Result<ExtractedK6, K6ParseError> {
    let summary: Summary = serde_json::from_slice(data)?;

    let duration = Stats::of(&summary, "http_req_duration");
    let reqs = Stats::of(&summary, "http_reqs");
    let failed = Stats::of(&summary, "http_req_failed");
    let checks = Stats::of(&summary, "checks");

    let duration_ms = summary
        .root_group
        .as_ref()
        .and_then(|g| g.duration)
        .or_else(|| summary.state.as_ref().and_then(|s| s.test_run_duration_ms))
        .map(|ms| ms as i64);

    let metrics = K6Metrics {
        p50_ms: duration.float("p(50)").or_else(|| duration.float("med")),
        p95_ms: duration.float("p(95)"),
        p99_ms: duration.float("p(99)"),
        mean_ms: duration.float("avg"),
        min_ms: duration.float("min"),
        max_ms: duration.float("max"),
        rps: reqs.float("rate"),
        error_rate: error_rate(&failed, &checks),
        total_requests: reqs.count("count"),
        // http_req_failed is a Rate metric, so failures are its "passes"
        failed_requests: failed.count("count").or_else(|| failed.count("passes")),
        duration_ms,
        vus: Stats::of(&summary, "vus").count("value"),
        vus_max: Stats::of(&summary, "vus_max").count("value"),
    };

    debug!(
        metrics = summary.metrics.len(),
        duration_ms = ?duration_ms,
        "extracted k6 summary"
    );

    Ok(ExtractedK6 {
        metrics,
        duration_ms,
    })
}

/// `http_req_failed.rate`, else `checks` fails over all checks, else one
/// minus the checks success rate.
fn error_rate(failed: &Stats<'_>, checks: &Stats<'_>) -> Option<f64> {
    if let Some(rate) = failed.float("rate").or_else(|| failed.float("value")) {
        return Some(rate);
    }
    if let (Some(passes), Some(fails)) = (checks.float("passes"), checks.float("fails")) {
        let total = passes + fails;
        if total > 0.0 {
            return Some(fails / total);
        }
    }
    checks
        .float("rate")
        .or_else(|| checks.float("value"))
        .map(|rate| 1.0 - rate)
}
