//! Human-readable rendering of metric values

use serde::{Deserialize, Serialize};

use crate::utils::format_size;

/// Unit a compared metric is measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricUnit {
    Nanoseconds,
    Milliseconds,
    Bytes,
    Count,
    PerSecond,
    /// Fraction in [0, 1], rendered as a percentage.
    Ratio,
}

impl MetricUnit {
    pub fn format(&self, value: f64) -> String {
        if value < 0.0 {
            return format!("-{}", self.format(-value));
        }
        match self {
            Self::Nanoseconds => format_nanos(value),
            Self::Milliseconds => {
                if value >= 1000.0 {
                    format!("{:.2}s", value / 1000.0)
                } else {
                    format!("{:.2}ms", value)
                }
            }
            Self::Bytes => format_size(value.round() as u64),
            Self::Count => format!("{}", value.round() as i64),
            Self::PerSecond => format!("{:.1}/s", value),
            Self::Ratio => format!("{:.2}%", value * 100.0),
        }
    }

    /// Format with an explicit sign, for deltas.
    pub fn format_signed(&self, value: f64) -> String {
        if value > 0.0 {
            format!("+{}", self.format(value))
        } else {
            self.format(value)
        }
    }
}

fn format_nanos(ns: f64) -> String {
    if ns < 1_000.0 {
        format!("{}ns", ns.round() as i64)
    } else if ns < 1_000_000.0 {
        format!("{:.1}µs", ns / 1_000.0)
    } else if ns < 1_000_000_000.0 {
        format!("{:.1}ms", ns / 1_000_000.0)
    } else {
        format!("{:.2}s", ns / 1_000_000_000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nanoseconds_scale() {
        assert_eq!(MetricUnit::Nanoseconds.format(512.0), "512ns");
        assert_eq!(MetricUnit::Nanoseconds.format(1_500.0), "1.5µs");
        assert_eq!(MetricUnit::Nanoseconds.format(12_300_000.0), "12.3ms");
        assert_eq!(MetricUnit::Nanoseconds.format(1_200_000_000.0), "1.20s");
    }

    #[test]
    fn test_bytes_and_ratio() {
        assert_eq!(MetricUnit::Bytes.format(2048.0), "2.0 KB");
        assert_eq!(MetricUnit::Ratio.format(0.05), "5.00%");
        assert_eq!(MetricUnit::PerSecond.format(120.0), "120.0/s");
    }

    #[test]
    fn test_signed_deltas() {
        assert_eq!(
            MetricUnit::Nanoseconds.format_signed(200_000_000.0),
            "+200.0ms"
        );
        assert_eq!(
            MetricUnit::Nanoseconds.format_signed(-300_000_000.0),
            "-300.0ms"
        );
        assert_eq!(MetricUnit::Count.format_signed(0.0), "0");
    }

    #[test]
    fn test_milliseconds_switch_to_seconds() {
        assert_eq!(MetricUnit::Milliseconds.format(95.5), "95.50ms");
        assert_eq!(MetricUnit::Milliseconds.format(2500.0), "2.50s");
    }
}
