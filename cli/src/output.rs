//! Output formatting utilities for CLI commands

use colored::Colorize;
use perfkit_collector::store::StoredProfile;
use perfkit_shared::types::format::MetricUnit;
use perfkit_shared::utils::format_size;
use perfkit_shared::{Classification, ComparisonReport, MetricDelta, PercentChange, ProfileKind};

/// Print success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print warning message
pub fn warning(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// One line of a capture round.
pub fn capture_ok(kind: ProfileKind, size: &str, label: &str) {
    println!("  {} {:<12} {}  ({})", "✓".green(), kind.as_str(), size, label);
}

pub fn capture_failed(kind: ProfileKind, err: &anyhow::Error) {
    println!("  {} {:<12} {:#}", "✗".red(), kind.as_str(), err);
}

pub fn format_percent(change: Option<PercentChange>) -> String {
    match change {
        Some(PercentChange::Finite(p)) => format!("{:+.1}%", p),
        Some(PercentChange::Unbounded) => "new".to_string(),
        None => "-".to_string(),
    }
}

fn marker(classification: Classification) -> &'static str {
    match classification {
        Classification::Improved => "▼ better",
        Classification::Regressed => "▲ worse",
        Classification::Neutral => "=",
        Classification::NoData => "no data",
    }
}

fn row(m: &MetricDelta) -> String {
    let previous = m
        .previous
        .map(|v| m.unit.format(v))
        .unwrap_or_else(|| "-".to_string());
    let current = m.formatted_value.clone().unwrap_or_else(|| "-".to_string());
    let delta = m.formatted_delta.clone().unwrap_or_else(|| "-".to_string());

    let line = format!(
        "  {:<24} {:>12} {:>12} {:>12} {:>9}  {}",
        m.label,
        previous,
        current,
        delta,
        format_percent(m.percent_change),
        marker(m.classification)
    );
    match m.classification {
        Classification::Improved => line.green().to_string(),
        Classification::Regressed => line.red().to_string(),
        Classification::Neutral => line,
        Classification::NoData => line.dimmed().to_string(),
    }
}

/// Render a comparison report; `names[i]` labels record `i`.
pub fn comparison_table(report: &ComparisonReport, names: &[String]) -> String {
    let name = |i: usize| names.get(i).map(String::as_str).unwrap_or("?");
    let mut out = String::new();

    let mode = if report.cumulative {
        "cumulative"
    } else {
        "snapshot"
    };
    out.push_str(&format!(
        "{} comparison of {} profiles ({})\n",
        report.kind.as_str().bold(),
        report.pairs.len() + 1,
        mode
    ));

    for pair in &report.pairs {
        out.push_str(&format!(
            "\n{} → {}\n",
            name(pair.previous_index).cyan(),
            name(pair.current_index).cyan()
        ));
        if pair.counter_reset {
            out.push_str(&format!(
                "{} counters went down: the process restarted between captures\n",
                "⚠".yellow()
            ));
        }
        out.push_str(&format!(
            "  {:<24} {:>12} {:>12} {:>12} {:>9}\n",
            "METRIC", "PREVIOUS", "CURRENT", "DELTA", "CHANGE"
        ));
        for m in &pair.metrics {
            out.push_str(&row(m));
            out.push('\n');
        }
        out.push_str(&format!(
            "  {} improved, {} regressed\n",
            pair.count(Classification::Improved),
            pair.count(Classification::Regressed)
        ));
    }
    out
}

/// Unit of the values credited to contributors of `kind`.
fn contributor_unit(kind: ProfileKind) -> MetricUnit {
    match kind {
        ProfileKind::Heap | ProfileKind::Allocs => MetricUnit::Bytes,
        ProfileKind::Cpu | ProfileKind::Mutex | ProfileKind::Block => MetricUnit::Nanoseconds,
        _ => MetricUnit::Count,
    }
}

/// Header and ranked contributors (or stacks) of one stored profile.
pub fn profile_summary(p: &StoredProfile) -> String {
    let mut out = format!(
        "{}  {} ({})\n",
        p.name.bold(),
        p.kind.as_str().cyan(),
        p.id
    );
    out.push_str(&format!(
        "  captured {}  project {}  session {}\n",
        p.created_at.format("%Y-%m-%d %H:%M:%S"),
        p.project,
        p.session.as_deref().unwrap_or("-")
    ));
    out.push_str(&format!(
        "  {} raw, {} samples{}\n",
        format_size(p.raw_size as u64),
        p.total_samples,
        if p.is_cumulative { ", cumulative" } else { "" }
    ));

    let contributors = p.metrics.contributors();
    if !contributors.is_empty() {
        let unit = contributor_unit(p.kind);
        out.push_str("\nTop contributors:\n");
        for (i, c) in contributors.iter().enumerate() {
            out.push_str(&format!(
                "  {:>2}. {:>7.2}%  {:>10}  {}\n",
                i + 1,
                c.percent_of_total,
                unit.format(c.value as f64),
                c.name
            ));
        }
    }

    let stacks = p.metrics.stacks();
    if !stacks.is_empty() {
        out.push_str("\nTop stacks:\n");
        for (i, s) in stacks.iter().enumerate() {
            out.push_str(&format!(
                "  {:>2}. {:>6}  {}\n",
                i + 1,
                s.count,
                s.stack.join(" <- ")
            ));
        }
    }
    out
}
