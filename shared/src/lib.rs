//! Shared types and utilities for perfkit
//!
//! This crate holds the data contract produced by ingestion (profile kinds,
//! kind-tagged metric records, k6 summaries) and the comparison engine that
//! turns an ordered set of records into a delta report.

pub mod types;
pub mod utils;

// Re-export commonly used types
pub use types::{compare::*, kind::*, metrics::*};
