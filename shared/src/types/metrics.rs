//! Metric records
//!
//! One record shape per [`ProfileKind`]. Records are produced once per
//! ingestion and never change kind afterwards; the enum tag is the kind.
//!
//! Optional fields distinguish "the source did not report this" (`None`)
//! from a reported zero, which the comparison engine turns into "no data"
//! rather than a zero delta.

use serde::{Deserialize, Serialize};

use super::kind::ProfileKind;

/// Maximum number of ranked contributors kept on a record.
pub const MAX_CONTRIBUTORS: usize = 10;

/// A function ranked by the value attributed to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributorEntry {
    pub name: String,
    pub value: i64,
    /// Share of the record's total, in [0, 100]. Zero when the total is zero.
    pub percent_of_total: f64,
}

/// A distinct call stack and the number of samples that carried it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackEntry {
    pub count: i64,
    /// Function names, leaf first.
    pub stack: Vec<String>,
    /// Kept for the contributor shape; stacks are counted, not weighted,
    /// so this is always 0.
    pub percent_of_total: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuMetrics {
    pub total_cpu_time_ns: i64,
    pub sample_count: i64,
    pub top_functions: Vec<ContributorEntry>,
}

/// Heap and allocs profiles. A column the profile did not declare is `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeapMetrics {
    pub alloc_space: Option<i64>,
    pub alloc_objects: Option<i64>,
    pub inuse_space: Option<i64>,
    pub inuse_objects: Option<i64>,
    pub top_allocators: Vec<ContributorEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MutexMetrics {
    pub contention_time_ns: Option<i64>,
    pub contention_count: Option<i64>,
    pub top_contenders: Vec<ContributorEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockMetrics {
    pub blocking_time_ns: Option<i64>,
    pub blocking_count: Option<i64>,
    pub top_blockers: Vec<ContributorEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoroutineMetrics {
    pub goroutine_count: i64,
    pub top_stacks: Vec<StackEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreadCreateMetrics {
    pub thread_count: i64,
    pub top_stacks: Vec<StackEntry>,
}

/// Garbage collector statistics. Not derivable from a pprof buffer; callers
/// construct these from runtime stats they collected themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcMetrics {
    pub pause_time_total_ns: Option<i64>,
    pub pause_count: Option<i64>,
    pub heap_goal: Option<i64>,
    pub last_pause_ns: Option<i64>,
}

/// Load test summary. Latencies are in milliseconds, `error_rate` in [0, 1].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct K6Metrics {
    pub p50_ms: Option<f64>,
    pub p95_ms: Option<f64>,
    pub p99_ms: Option<f64>,
    pub mean_ms: Option<f64>,
    pub min_ms: Option<f64>,
    pub max_ms: Option<f64>,
    pub rps: Option<f64>,
    pub error_rate: Option<f64>,
    pub total_requests: Option<i64>,
    pub failed_requests: Option<i64>,
    pub duration_ms: Option<i64>,
    pub vus: Option<i64>,
    pub vus_max: Option<i64>,
}

/// Kind-tagged metrics record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "metrics", rename_all = "snake_case")]
pub enum MetricsRecord {
    Cpu(CpuMetrics),
    Heap(HeapMetrics),
    Goroutine(GoroutineMetrics),
    Block(BlockMetrics),
    Mutex(MutexMetrics),
    Allocs(HeapMetrics),
    #[serde(rename = "threadcreate")]
    ThreadCreate(ThreadCreateMetrics),
    Gc(GcMetrics),
    K6(K6Metrics),
}

impl MetricsRecord {
    pub fn kind(&self) -> ProfileKind {
        match self {
            Self::Cpu(_) => ProfileKind::Cpu,
            Self::Heap(_) => ProfileKind::Heap,
            Self::Goroutine(_) => ProfileKind::Goroutine,
            Self::Block(_) => ProfileKind::Block,
            Self::Mutex(_) => ProfileKind::Mutex,
            Self::Allocs(_) => ProfileKind::Allocs,
            Self::ThreadCreate(_) => ProfileKind::ThreadCreate,
            Self::Gc(_) => ProfileKind::Gc,
            Self::K6(_) => ProfileKind::K6,
        }
    }

    /// Ranked function contributors, empty for kinds ranked by stack or
    /// without attribution.
    pub fn contributors(&self) -> &[ContributorEntry] {
        match self {
            Self::Cpu(m) => &m.top_functions,
            Self::Heap(m) | Self::Allocs(m) => &m.top_allocators,
            Self::Mutex(m) => &m.top_contenders,
            Self::Block(m) => &m.top_blockers,
            Self::Goroutine(_) | Self::ThreadCreate(_) | Self::Gc(_) | Self::K6(_) => &[],
        }
    }

    /// Ranked call stacks for goroutine-style records.
    pub fn stacks(&self) -> &[StackEntry] {
        match self {
            Self::Goroutine(m) => &m.top_stacks,
            Self::ThreadCreate(m) => &m.top_stacks,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_variant() {
        assert_eq!(
            MetricsRecord::Allocs(HeapMetrics::default()).kind(),
            ProfileKind::Allocs
        );
        assert_eq!(
            MetricsRecord::ThreadCreate(ThreadCreateMetrics::default()).kind(),
            ProfileKind::ThreadCreate
        );
        assert_eq!(MetricsRecord::K6(K6Metrics::default()).kind(), ProfileKind::K6);
    }

    #[test]
    fn test_serialized_tag_is_kind_name() {
        let record = MetricsRecord::ThreadCreate(ThreadCreateMetrics::default());
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["kind"], "threadcreate");
        assert_eq!(value["metrics"]["thread_count"], 0);
    }

    #[test]
    fn test_absent_k6_fields_serialize_as_null() {
        let record = MetricsRecord::K6(K6Metrics {
            p95_ms: Some(120.5),
            ..Default::default()
        });
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["metrics"]["p95_ms"], 120.5);
        assert!(value["metrics"]["rps"].is_null());
    }

    #[test]
    fn test_contributors_by_kind() {
        let entry = ContributorEntry {
            name: "main.work".to_string(),
            value: 10,
            percent_of_total: 100.0,
        };
        let record = MetricsRecord::Mutex(MutexMetrics {
            contention_time_ns: Some(10),
            contention_count: Some(1),
            top_contenders: vec![entry.clone()],
        });
        assert_eq!(record.contributors(), &[entry]);
        assert!(record.stacks().is_empty());
        assert!(MetricsRecord::Goroutine(GoroutineMetrics::default())
            .contributors()
            .is_empty());
    }
}
