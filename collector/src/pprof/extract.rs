//! Per-kind metric extractors.
//!
//! Each extractor makes one pass over the samples, sums scalar totals and
//! credits a value to every function on the sample's stack (once per frame,
//! so recursion is counted at each occurrence). Missing value columns
//! contribute 0.

use perfkit_shared::{
    BlockMetrics, ContributorEntry, CpuMetrics, GoroutineMetrics, HeapMetrics, MutexMetrics,
    StackEntry, ThreadCreateMetrics, MAX_CONTRIBUTORS,
};

use super::decode::DecodedProfile;
use crate::aggregate::{credit, saturating_sum, top_n, Attribution};

fn contributors(totals: &Attribution<String>, grand_total: i64) -> Vec<ContributorEntry> {
    top_n(totals, grand_total, MAX_CONTRIBUTORS)
        .into_iter()
        .map(|r| ContributorEntry {
            name: r.key,
            value: r.value,
            percent_of_total: r.percent,
        })
        .collect()
}

/// Position of the CPU time column: the first nanosecond-valued sample
/// type, else the first column.
fn cpu_time_column(p: &DecodedProfile) -> usize {
    p.sample_types
        .iter()
        .position(|st| st.unit == "nanoseconds")
        .unwrap_or(0)
}

pub fn cpu(p: &DecodedProfile) -> CpuMetrics {
    let column = cpu_time_column(p);
    let mut funcs = Attribution::new();
    let mut total = 0i64;

    for sample in &p.samples {
        if sample.values.is_empty() || sample.locations.is_empty() {
            continue;
        }
        let value = sample.value(column);
        total = total.saturating_add(value);
        for name in p.frames(sample) {
            credit(&mut funcs, name.to_string(), value);
        }
    }

    CpuMetrics {
        total_cpu_time_ns: total,
        sample_count: p.samples.len() as i64,
        top_functions: contributors(&funcs, total),
    }
}

/// Heap-shaped extraction, shared by heap and allocs profiles. Functions
/// are ranked by allocated bytes.
pub fn heap(p: &DecodedProfile) -> HeapMetrics {
    let alloc_space = p.column("alloc_space");
    let alloc_objects = p.column("alloc_objects");
    let inuse_space = p.column("inuse_space");
    let inuse_objects = p.column("inuse_objects");

    let sum = |column: Option<usize>| -> Option<i64> {
        column.map(|c| saturating_sum(p.samples.iter().map(|s| s.value(c))))
    };

    let mut funcs = Attribution::new();
    if let Some(column) = alloc_space {
        for sample in &p.samples {
            let value = sample.value(column);
            for name in p.frames(sample) {
                credit(&mut funcs, name.to_string(), value);
            }
        }
    }

    let alloc_total = sum(alloc_space);
    HeapMetrics {
        alloc_space: alloc_total,
        alloc_objects: sum(alloc_objects),
        inuse_space: sum(inuse_space),
        inuse_objects: sum(inuse_objects),
        top_allocators: contributors(&funcs, alloc_total.unwrap_or(0)),
    }
}

/// Count (column 0) and delay (column 1) totals, with functions ranked by
/// delay. Both are `None` when the profile declares fewer than two columns.
fn contention(p: &DecodedProfile) -> (Option<i64>, Option<i64>, Vec<ContributorEntry>) {
    if p.sample_types.len() < 2 {
        return (None, None, Vec::new());
    }

    let mut funcs = Attribution::new();
    let mut count = 0i64;
    let mut delay = 0i64;

    for sample in &p.samples {
        if sample.values.len() < 2 {
            continue;
        }
        count = count.saturating_add(sample.value(0));
        let value = sample.value(1);
        delay = delay.saturating_add(value);
        for name in p.frames(sample) {
            credit(&mut funcs, name.to_string(), value);
        }
    }

    (Some(count), Some(delay), contributors(&funcs, delay))
}

pub fn mutex(p: &DecodedProfile) -> MutexMetrics {
    let (count, delay, top) = contention(p);
    MutexMetrics {
        contention_time_ns: delay,
        contention_count: count,
        top_contenders: top,
    }
}

pub fn block(p: &DecodedProfile) -> BlockMetrics {
    let (count, delay, top) = contention(p);
    BlockMetrics {
        blocking_time_ns: delay,
        blocking_count: count,
        top_blockers: top,
    }
}

/// Distinct stacks ranked by how many samples carry them.
fn stacks(p: &DecodedProfile) -> Vec<StackEntry> {
    let mut counts: Attribution<Vec<String>> = Attribution::new();
    for sample in &p.samples {
        let stack: Vec<String> = p.frames(sample).map(str::to_string).collect();
        credit(&mut counts, stack, 1);
    }

    top_n(&counts, 0, MAX_CONTRIBUTORS)
        .into_iter()
        .map(|r| StackEntry {
            count: r.value,
            stack: r.key,
            percent_of_total: 0.0,
        })
        .collect()
}

pub fn goroutine(p: &DecodedProfile) -> GoroutineMetrics {
    GoroutineMetrics {
        goroutine_count: p.samples.len() as i64,
        top_stacks: stacks(p),
    }
}

pub fn threadcreate(p: &DecodedProfile) -> ThreadCreateMetrics {
    ThreadCreateMetrics {
        thread_count: p.samples.len() as i64,
        top_stacks: stacks(p),
    }
}
