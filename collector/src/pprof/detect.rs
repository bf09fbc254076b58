//! Profile kind detection from declared sample types.
//!
//! This is a fallback heuristic, not a classification guarantee. Sample
//! types are scanned in declaration order and each one is tested against
//! the signatures below in priority order: cpu, heap, mutex, block,
//! goroutine. The first match wins; a profile matching nothing is treated
//! as cpu. Notably `allocs` and `threadcreate` profiles are never detected
//! (the former looks like heap, the latter falls through to cpu), so callers
//! that know the kind should pass it explicitly instead of detecting.

use perfkit_shared::ProfileKind;

use super::decode::SampleType;

fn signature(st: &SampleType) -> Option<ProfileKind> {
    match st.name.as_str() {
        "cpu" | "samples" if matches!(st.unit.as_str(), "nanoseconds" | "count") => {
            Some(ProfileKind::Cpu)
        }
        "alloc_objects" | "alloc_space" | "inuse_objects" | "inuse_space" => {
            Some(ProfileKind::Heap)
        }
        "contentions" | "delay" => Some(ProfileKind::Mutex),
        "block" => Some(ProfileKind::Block),
        "goroutine" => Some(ProfileKind::Goroutine),
        _ => None,
    }
}

/// Classify a profile by its sample types.
pub fn detect_kind(sample_types: &[SampleType]) -> ProfileKind {
    sample_types
        .iter()
        .find_map(signature)
        .unwrap_or(ProfileKind::Cpu)
}
