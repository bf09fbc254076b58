//! Metric record types and the comparison engine

pub mod compare;
pub mod format;
pub mod kind;
pub mod metrics;
