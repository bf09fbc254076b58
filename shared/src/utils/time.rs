//! Time-related utilities

use chrono::{DateTime, Utc};

/// Compact timestamp used in generated profile names, e.g. `20240131-154502`.
pub fn capture_stamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d-%H%M%S").to_string()
}

/// Default name for a capture of `prefix` taken at `at`.
pub fn default_profile_name(prefix: &str, at: DateTime<Utc>) -> String {
    format!("{}-{}", prefix, capture_stamp(at))
}

/// Convert a millisecond duration to nanoseconds, saturating on overflow.
pub fn millis_to_nanos(ms: i64) -> i64 {
    ms.saturating_mul(1_000_000)
}
