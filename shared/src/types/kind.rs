//! Profile kinds
//!
//! The closed set of profile kinds perfkit knows how to ingest and compare.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of a captured profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileKind {
    Cpu,
    Heap,
    Goroutine,
    Block,
    Mutex,
    Allocs,
    #[serde(rename = "threadcreate")]
    ThreadCreate,
    Gc,
    K6,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid profile type: {0}")]
pub struct UnknownKind(pub String);

impl ProfileKind {
    pub const ALL: [ProfileKind; 9] = [
        ProfileKind::Cpu,
        ProfileKind::Heap,
        ProfileKind::Goroutine,
        ProfileKind::Block,
        ProfileKind::Mutex,
        ProfileKind::Allocs,
        ProfileKind::ThreadCreate,
        ProfileKind::Gc,
        ProfileKind::K6,
    ];

    /// Kinds a Go process exposes under `/debug/pprof/`, in capture order.
    pub const CAPTURABLE: [ProfileKind; 7] = [
        ProfileKind::Cpu,
        ProfileKind::Heap,
        ProfileKind::Goroutine,
        ProfileKind::Block,
        ProfileKind::Mutex,
        ProfileKind::Allocs,
        ProfileKind::ThreadCreate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Heap => "heap",
            Self::Goroutine => "goroutine",
            Self::Block => "block",
            Self::Mutex => "mutex",
            Self::Allocs => "allocs",
            Self::ThreadCreate => "threadcreate",
            Self::Gc => "gc",
            Self::K6 => "k6",
        }
    }

    /// Cumulative kinds accumulate since the profiled process started, so a
    /// later capture is never smaller unless the process restarted.
    pub fn is_cumulative(&self) -> bool {
        matches!(self, Self::Block | Self::Mutex | Self::Allocs)
    }

    /// Path of the `net/http/pprof` handler serving this kind.
    pub fn pprof_endpoint(&self) -> Option<&'static str> {
        match self {
            Self::Cpu => Some("/debug/pprof/profile"),
            Self::Heap => Some("/debug/pprof/heap"),
            Self::Goroutine => Some("/debug/pprof/goroutine"),
            Self::Block => Some("/debug/pprof/block"),
            Self::Mutex => Some("/debug/pprof/mutex"),
            Self::Allocs => Some("/debug/pprof/allocs"),
            Self::ThreadCreate => Some("/debug/pprof/threadcreate"),
            Self::Gc | Self::K6 => None,
        }
    }
}

impl fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        ProfileKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == needle)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trips_every_kind() {
        for kind in ProfileKind::ALL {
            assert_eq!(kind.as_str().parse::<ProfileKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_parse_rejects_unknown() {
        let err = "trace".parse::<ProfileKind>().unwrap_err();
        assert_eq!(err.to_string(), "invalid profile type: trace");
    }

    #[test]
    fn test_cumulative_kinds() {
        let cumulative: Vec<_> = ProfileKind::ALL
            .into_iter()
            .filter(|k| k.is_cumulative())
            .collect();
        assert_eq!(
            cumulative,
            vec![ProfileKind::Block, ProfileKind::Mutex, ProfileKind::Allocs]
        );
    }

    #[test]
    fn test_serde_names_match_as_str() {
        for kind in ProfileKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn test_only_pprof_kinds_are_capturable() {
        for kind in ProfileKind::CAPTURABLE {
            assert!(kind.pprof_endpoint().is_some());
        }
        assert!(ProfileKind::K6.pprof_endpoint().is_none());
        assert!(ProfileKind::Gc.pprof_endpoint().is_none());
    }
}
