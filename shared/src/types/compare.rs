//! Comparison engine
//!
//! Compares an ordered (oldest first) list of metric records of one kind.
//! Every record is compared against the record immediately before it, so a
//! list of `n` records yields `n - 1` pairs.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;

use super::format::MetricUnit;
use super::kind::ProfileKind;
use super::metrics::{
    BlockMetrics, CpuMetrics, GcMetrics, HeapMetrics, K6Metrics, MetricsRecord, MutexMetrics,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompareError {
    #[error("at least 2 profiles are required for comparison, got {got}")]
    InsufficientInput { got: usize },

    #[error("all profiles must be of the same type: record {index} is {found}, expected {expected}")]
    MismatchedKind {
        index: usize,
        expected: ProfileKind,
        found: ProfileKind,
    },
}

/// A compared metric: how to read it from a record and which way is better.
#[derive(Debug, Clone, Copy)]
pub struct MetricSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub unit: MetricUnit,
    pub lower_is_better: bool,
    extract: fn(&MetricsRecord) -> Option<f64>,
}

impl MetricSpec {
    pub fn value(&self, record: &MetricsRecord) -> Option<f64> {
        (self.extract)(record)
    }
}

fn cpu(r: &MetricsRecord) -> Option<&CpuMetrics> {
    match r {
        MetricsRecord::Cpu(m) => Some(m),
        _ => None,
    }
}

fn heap(r: &MetricsRecord) -> Option<&HeapMetrics> {
    match r {
        MetricsRecord::Heap(m) | MetricsRecord::Allocs(m) => Some(m),
        _ => None,
    }
}

fn mutex(r: &MetricsRecord) -> Option<&MutexMetrics> {
    match r {
        MetricsRecord::Mutex(m) => Some(m),
        _ => None,
    }
}

fn block(r: &MetricsRecord) -> Option<&BlockMetrics> {
    match r {
        MetricsRecord::Block(m) => Some(m),
        _ => None,
    }
}

fn gc(r: &MetricsRecord) -> Option<&GcMetrics> {
    match r {
        MetricsRecord::Gc(m) => Some(m),
        _ => None,
    }
}

fn k6(r: &MetricsRecord) -> Option<&K6Metrics> {
    match r {
        MetricsRecord::K6(m) => Some(m),
        _ => None,
    }
}

fn int(v: Option<i64>) -> Option<f64> {
    v.map(|v| v as f64)
}

static CPU_METRICS: [MetricSpec; 2] = [
    MetricSpec {
        name: "total_cpu_time_ns",
        label: "CPU Time",
        unit: MetricUnit::Nanoseconds,
        lower_is_better: true,
        extract: |r| cpu(r).map(|m| m.total_cpu_time_ns as f64),
    },
    MetricSpec {
        name: "sample_count",
        label: "Samples",
        unit: MetricUnit::Count,
        lower_is_better: true,
        extract: |r| cpu(r).map(|m| m.sample_count as f64),
    },
];

static HEAP_METRICS: [MetricSpec; 4] = [
    MetricSpec {
        name: "alloc_space",
        label: "Allocated",
        unit: MetricUnit::Bytes,
        lower_is_better: true,
        extract: |r| heap(r).and_then(|m| int(m.alloc_space)),
    },
    MetricSpec {
        name: "alloc_objects",
        label: "Allocated Objects",
        unit: MetricUnit::Count,
        lower_is_better: true,
        extract: |r| heap(r).and_then(|m| int(m.alloc_objects)),
    },
    MetricSpec {
        name: "inuse_space",
        label: "In Use",
        unit: MetricUnit::Bytes,
        lower_is_better: true,
        extract: |r| heap(r).and_then(|m| int(m.inuse_space)),
    },
    MetricSpec {
        name: "inuse_objects",
        label: "In Use Objects",
        unit: MetricUnit::Count,
        lower_is_better: true,
        extract: |r| heap(r).and_then(|m| int(m.inuse_objects)),
    },
];

static MUTEX_METRICS: [MetricSpec; 2] = [
    MetricSpec {
        name: "contention_time_ns",
        label: "Contention Time",
        unit: MetricUnit::Nanoseconds,
        lower_is_better: true,
        extract: |r| mutex(r).and_then(|m| int(m.contention_time_ns)),
    },
    MetricSpec {
        name: "contention_count",
        label: "Contentions",
        unit: MetricUnit::Count,
        lower_is_better: true,
        extract: |r| mutex(r).and_then(|m| int(m.contention_count)),
    },
];

static BLOCK_METRICS: [MetricSpec; 2] = [
    MetricSpec {
        name: "blocking_time_ns",
        label: "Blocking Time",
        unit: MetricUnit::Nanoseconds,
        lower_is_better: true,
        extract: |r| block(r).and_then(|m| int(m.blocking_time_ns)),
    },
    MetricSpec {
        name: "blocking_count",
        label: "Blocking Events",
        unit: MetricUnit::Count,
        lower_is_better: true,
        extract: |r| block(r).and_then(|m| int(m.blocking_count)),
    },
];

static GOROUTINE_METRICS: [MetricSpec; 1] = [MetricSpec {
    name: "goroutine_count",
    label: "Goroutines",
    unit: MetricUnit::Count,
    lower_is_better: true,
    extract: |r| match r {
        MetricsRecord::Goroutine(m) => Some(m.goroutine_count as f64),
        _ => None,
    },
}];

static THREADCREATE_METRICS: [MetricSpec; 1] = [MetricSpec {
    name: "thread_count",
    label: "Threads Created",
    unit: MetricUnit::Count,
    lower_is_better: true,
    extract: |r| match r {
        MetricsRecord::ThreadCreate(m) => Some(m.thread_count as f64),
        _ => None,
    },
}];

static GC_METRICS: [MetricSpec; 4] = [
    MetricSpec {
        name: "pause_time_total_ns",
        label: "GC Pause Total",
        unit: MetricUnit::Nanoseconds,
        lower_is_better: true,
        extract: |r| gc(r).and_then(|m| int(m.pause_time_total_ns)),
    },
    MetricSpec {
        name: "pause_count",
        label: "GC Pauses",
        unit: MetricUnit::Count,
        lower_is_better: true,
        extract: |r| gc(r).and_then(|m| int(m.pause_count)),
    },
    MetricSpec {
        name: "heap_goal",
        label: "Heap Goal",
        unit: MetricUnit::Bytes,
        lower_is_better: true,
        extract: |r| gc(r).and_then(|m| int(m.heap_goal)),
    },
    MetricSpec {
        name: "last_pause_ns",
        label: "Last GC Pause",
        unit: MetricUnit::Nanoseconds,
        lower_is_better: true,
        extract: |r| gc(r).and_then(|m| int(m.last_pause_ns)),
    },
];

static K6_METRICS: [MetricSpec; 10] = [
    MetricSpec {
        name: "p50_ms",
        label: "P50",
        unit: MetricUnit::Milliseconds,
        lower_is_better: true,
        extract: |r| k6(r).and_then(|m| m.p50_ms),
    },
    MetricSpec {
        name: "p95_ms",
        label: "P95",
        unit: MetricUnit::Milliseconds,
        lower_is_better: true,
        extract: |r| k6(r).and_then(|m| m.p95_ms),
    },
    MetricSpec {
        name: "p99_ms",
        label: "P99",
        unit: MetricUnit::Milliseconds,
        lower_is_better: true,
        extract: |r| k6(r).and_then(|m| m.p99_ms),
    },
    MetricSpec {
        name: "mean_ms",
        label: "Mean",
        unit: MetricUnit::Milliseconds,
        lower_is_better: true,
        extract: |r| k6(r).and_then(|m| m.mean_ms),
    },
    MetricSpec {
        name: "min_ms",
        label: "Min",
        unit: MetricUnit::Milliseconds,
        lower_is_better: true,
        extract: |r| k6(r).and_then(|m| m.min_ms),
    },
    MetricSpec {
        name: "max_ms",
        label: "Max",
        unit: MetricUnit::Milliseconds,
        lower_is_better: true,
        extract: |r| k6(r).and_then(|m| m.max_ms),
    },
    MetricSpec {
        name: "rps",
        label: "Requests/s",
        unit: MetricUnit::PerSecond,
        lower_is_better: false,
        extract: |r| k6(r).and_then(|m| m.rps),
    },
    MetricSpec {
        name: "error_rate",
        label: "Error Rate",
        unit: MetricUnit::Ratio,
        lower_is_better: true,
        extract: |r| k6(r).and_then(|m| m.error_rate),
    },
    MetricSpec {
        name: "total_requests",
        label: "Requests",
        unit: MetricUnit::Count,
        lower_is_better: false,
        extract: |r| k6(r).and_then(|m| int(m.total_requests)),
    },
    MetricSpec {
        name: "failed_requests",
        label: "Failed Requests",
        unit: MetricUnit::Count,
        lower_is_better: true,
        extract: |r| k6(r).and_then(|m| int(m.failed_requests)),
    },
];

/// The fixed set of compared metrics for a kind, in display order.
pub fn metric_table(kind: ProfileKind) -> &'static [MetricSpec] {
    match kind {
        ProfileKind::Cpu => &CPU_METRICS,
        ProfileKind::Heap | ProfileKind::Allocs => &HEAP_METRICS,
        ProfileKind::Mutex => &MUTEX_METRICS,
        ProfileKind::Block => &BLOCK_METRICS,
        ProfileKind::Goroutine => &GOROUTINE_METRICS,
        ProfileKind::ThreadCreate => &THREADCREATE_METRICS,
        ProfileKind::Gc => &GC_METRICS,
        ProfileKind::K6 => &K6_METRICS,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Improved,
    Regressed,
    Neutral,
    /// One side of the pair did not report the metric.
    NoData,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PercentChange {
    Finite(f64),
    /// The previous value was zero.
    Unbounded,
}

/// Change of one metric between two adjacent records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDelta {
    pub name: String,
    pub label: String,
    pub unit: MetricUnit,
    pub lower_is_better: bool,
    pub previous: Option<f64>,
    pub value: Option<f64>,
    /// value - previous
    pub delta: Option<f64>,
    pub percent_change: Option<PercentChange>,
    pub classification: Classification,
    pub formatted_value: Option<String>,
    pub formatted_delta: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairComparison {
    pub previous_index: usize,
    pub current_index: usize,
    /// A cumulative metric went down, so the profiled process restarted
    /// between the two captures.
    pub counter_reset: bool,
    pub metrics: Vec<MetricDelta>,
}

impl PairComparison {
    pub fn count(&self, classification: Classification) -> usize {
        self.metrics
            .iter()
            .filter(|m| m.classification == classification)
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub kind: ProfileKind,
    pub cumulative: bool,
    pub pairs: Vec<PairComparison>,
}

/// Classify the move from `previous` to `value` for one metric.
pub fn compare_metric(spec: &MetricSpec, previous: Option<f64>, value: Option<f64>) -> MetricDelta {
    let formatted_value = value.map(|v| spec.unit.format(v));
    let (delta, percent_change, classification) = match (previous, value) {
        (Some(prev), Some(curr)) => {
            let delta = curr - prev;
            if delta == 0.0 {
                (delta, PercentChange::Finite(0.0), Classification::Neutral)
            } else {
                let pct = if prev != 0.0 {
                    PercentChange::Finite(delta / prev * 100.0)
                } else {
                    PercentChange::Unbounded
                };
                let class = if (delta < 0.0) == spec.lower_is_better {
                    Classification::Improved
                } else {
                    Classification::Regressed
                };
                (delta, pct, class)
            }
        }
        _ => {
            return MetricDelta {
                name: spec.name.to_string(),
                label: spec.label.to_string(),
                unit: spec.unit,
                lower_is_better: spec.lower_is_better,
                previous,
                value,
                delta: None,
                percent_change: None,
                classification: Classification::NoData,
                formatted_value,
                formatted_delta: None,
            }
        }
    };

    MetricDelta {
        name: spec.name.to_string(),
        label: spec.label.to_string(),
        unit: spec.unit,
        lower_is_better: spec.lower_is_better,
        previous,
        value,
        delta: Some(delta),
        percent_change: Some(percent_change),
        classification,
        formatted_value,
        formatted_delta: Some(spec.unit.format_signed(delta)),
    }
}

/// Compare each record against the one before it.
///
/// All records must share one kind; a mixed batch is rejected before any
/// delta is computed.
pub fn compare_records<R: Borrow<MetricsRecord>>(
    records: &[R],
) -> Result<ComparisonReport, CompareError> {
    if records.len() < 2 {
        return Err(CompareError::InsufficientInput { got: records.len() });
    }

    let expected = records[0].borrow().kind();
    if let Some((index, found)) = records
        .iter()
        .map(|r| r.borrow().kind())
        .enumerate()
        .find(|(_, k)| *k != expected)
    {
        return Err(CompareError::MismatchedKind {
            index,
            expected,
            found,
        });
    }

    let table = metric_table(expected);
    let cumulative = expected.is_cumulative();

    let pairs = records
        .windows(2)
        .enumerate()
        .map(|(i, pair)| {
            let (prev, curr) = (pair[0].borrow(), pair[1].borrow());
            let metrics: Vec<MetricDelta> = table
                .iter()
                .map(|spec| compare_metric(spec, spec.value(prev), spec.value(curr)))
                .collect();
            let counter_reset =
                cumulative && metrics.iter().any(|m| m.delta.is_some_and(|d| d < 0.0));
            PairComparison {
                previous_index: i,
                current_index: i + 1,
                counter_reset,
                metrics,
            }
        })
        .collect();

    Ok(ComparisonReport {
        kind: expected,
        cumulative,
        pairs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::metrics::{GoroutineMetrics, K6Metrics};

    fn cpu_record(total_ns: i64) -> MetricsRecord {
        MetricsRecord::Cpu(CpuMetrics {
            total_cpu_time_ns: total_ns,
            sample_count: 100,
            top_functions: vec![],
        })
    }

    fn k6_record(rps: f64) -> MetricsRecord {
        MetricsRecord::K6(K6Metrics {
            rps: Some(rps),
            ..Default::default()
        })
    }

    fn metric<'a>(pair: &'a PairComparison, name: &str) -> &'a MetricDelta {
        pair.metrics.iter().find(|m| m.name == name).unwrap()
    }

    fn pct(delta: &MetricDelta) -> f64 {
        match delta.percent_change {
            Some(PercentChange::Finite(p)) => p,
            other => panic!("expected finite percent change, got {:?}", other),
        }
    }

    #[test]
    fn test_sequential_cpu_pairs() {
        let records = vec![
            cpu_record(1_000_000_000),
            cpu_record(1_200_000_000),
            cpu_record(900_000_000),
        ];
        let report = compare_records(&records).unwrap();
        assert_eq!(report.kind, ProfileKind::Cpu);
        assert!(!report.cumulative);
        assert_eq!(report.pairs.len(), 2);

        let first = metric(&report.pairs[0], "total_cpu_time_ns");
        assert_eq!(first.delta, Some(200_000_000.0));
        assert_eq!(first.classification, Classification::Regressed);
        assert!((pct(first) - 20.0).abs() < 1e-9);

        // Compared against the immediately preceding record, not the first.
        let second = metric(&report.pairs[1], "total_cpu_time_ns");
        assert_eq!(second.delta, Some(-300_000_000.0));
        assert_eq!(second.classification, Classification::Improved);
        assert!((pct(second) - (-25.0)).abs() < 1e-9);
        assert_eq!(report.pairs[1].previous_index, 1);
        assert_eq!(report.pairs[1].current_index, 2);
    }

    #[test]
    fn test_lower_is_better_decrease_improves() {
        let report = compare_records(&[cpu_record(100), cpu_record(80)]).unwrap();
        let m = metric(&report.pairs[0], "total_cpu_time_ns");
        assert_eq!(m.classification, Classification::Improved);
        assert!((pct(m) - (-20.0)).abs() < 1e-9);
    }

    #[test]
    fn test_higher_is_better_increase_improves() {
        let report = compare_records(&[k6_record(100.0), k6_record(120.0)]).unwrap();
        let m = metric(&report.pairs[0], "rps");
        assert_eq!(m.classification, Classification::Improved);
        assert!((pct(m) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_identical_records_are_neutral() {
        let record = cpu_record(5_000);
        let report = compare_records(&[record.clone(), record]).unwrap();
        for m in &report.pairs[0].metrics {
            assert_eq!(m.classification, Classification::Neutral);
            assert_eq!(m.delta, Some(0.0));
        }
    }

    #[test]
    fn test_missing_field_is_no_data() {
        let report = compare_records(&[k6_record(100.0), k6_record(90.0)]).unwrap();
        let p95 = metric(&report.pairs[0], "p95_ms");
        assert_eq!(p95.classification, Classification::NoData);
        assert_eq!(p95.delta, None);
        assert_eq!(p95.percent_change, None);
    }

    #[test]
    fn test_zero_previous_is_unbounded() {
        let report = compare_records(&[cpu_record(0), cpu_record(10)]).unwrap();
        let m = metric(&report.pairs[0], "total_cpu_time_ns");
        assert_eq!(m.percent_change, Some(PercentChange::Unbounded));
        assert_eq!(m.classification, Classification::Regressed);
    }

    #[test]
    fn test_mixed_kinds_rejected() {
        let goroutines = MetricsRecord::Goroutine(GoroutineMetrics::default());
        let err = compare_records(&[cpu_record(1), cpu_record(2), goroutines]).unwrap_err();
        assert_eq!(
            err,
            CompareError::MismatchedKind {
                index: 2,
                expected: ProfileKind::Cpu,
                found: ProfileKind::Goroutine,
            }
        );

        let err = compare_records(&[k6_record(1.0), cpu_record(1)]).unwrap_err();
        assert!(matches!(err, CompareError::MismatchedKind { index: 1, .. }));
    }

    #[test]
    fn test_insufficient_input() {
        let err = compare_records(&[cpu_record(1)]).unwrap_err();
        assert_eq!(err, CompareError::InsufficientInput { got: 1 });
        let empty: Vec<MetricsRecord> = vec![];
        assert!(compare_records(&empty).is_err());
    }

    #[test]
    fn test_cumulative_decrease_flags_counter_reset() {
        let mutex = |ns: i64| {
            MetricsRecord::Mutex(MutexMetrics {
                contention_time_ns: Some(ns),
                contention_count: Some(10),
                top_contenders: vec![],
            })
        };
        let report = compare_records(&[mutex(500), mutex(900), mutex(100)]).unwrap();
        assert!(report.cumulative);
        assert!(!report.pairs[0].counter_reset);
        assert!(report.pairs[1].counter_reset);
    }

    #[test]
    fn test_allocs_uses_heap_table() {
        let allocs = |bytes: i64| {
            MetricsRecord::Allocs(HeapMetrics {
                alloc_space: Some(bytes),
                ..Default::default()
            })
        };
        let report = compare_records(&[allocs(1024), allocs(2048)]).unwrap();
        let m = metric(&report.pairs[0], "alloc_space");
        assert_eq!(m.classification, Classification::Regressed);
        assert_eq!(m.formatted_delta.as_deref(), Some("+1.0 KB"));
        assert_eq!(report.pairs[0].count(Classification::NoData), 3);
    }

    #[test]
    fn test_every_kind_has_a_table() {
        for kind in ProfileKind::ALL {
            assert!(!metric_table(kind).is_empty(), "no metrics for {}", kind);
        }
    }
}
