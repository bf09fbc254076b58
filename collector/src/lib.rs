//! perfkit collector library
//!
//! Decodes uploaded pprof profiles and k6 summaries into typed metric
//! records, keeps them in a store and serves them over HTTP.

pub mod aggregate;
pub mod config;
pub mod ingest;
pub mod k6;
pub mod metrics;
pub mod pprof;
pub mod server;
pub mod store;

pub use k6::{extract_k6_summary, ExtractedK6, K6ParseError};
pub use pprof::{extract_profile, ExtractError, ExtractedProfile};
