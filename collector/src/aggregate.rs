//! Attribution totals and top-N ranking
//!
//! Extractors credit sample values to attribution keys (function names or
//! whole stacks) and then keep only the largest few.

use indexmap::IndexMap;
use std::hash::Hash;

/// Running totals per attribution key, in first-seen order.
pub type Attribution<K> = IndexMap<K, i64>;

/// Add `value` to the running total of `key`, saturating at the i64 bounds.
pub fn credit<K: Eq + Hash>(totals: &mut Attribution<K>, key: K, value: i64) {
    let total = totals.entry(key).or_insert(0);
    *total = total.saturating_add(value);
}

/// Saturating sum, for sample values that come straight off the wire.
pub fn saturating_sum(values: impl IntoIterator<Item = i64>) -> i64 {
    values.into_iter().fold(0i64, i64::saturating_add)
}

/// One ranked key.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranked<K> {
    pub key: K,
    pub value: i64,
    /// `value / grand_total * 100`, clamped to [0, 100]; 0 when the grand
    /// total is not positive.
    pub percent: f64,
}

/// Percentage of `value` in `grand_total`, clamped to [0, 100].
pub fn percent_of(value: i64, grand_total: i64) -> f64 {
    if grand_total <= 0 {
        return 0.0;
    }
    (value as f64 / grand_total as f64 * 100.0).clamp(0.0, 100.0)
}

/// The `n` largest totals, descending. Equal values keep first-seen order.
pub fn top_n<K: Clone>(totals: &Attribution<K>, grand_total: i64, n: usize) -> Vec<Ranked<K>> {
    let mut sorted: Vec<(&K, &i64)> = totals.iter().collect();
    // sort_by is stable, so ties stay in insertion order
    sorted.sort_by(|a, b| b.1.cmp(a.1));

    sorted
        .into_iter()
        .take(n)
        .map(|(key, &value)| Ranked {
            key: key.clone(),
            value,
            percent: percent_of(value, grand_total),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn totals(pairs: &[(&str, i64)]) -> Attribution<String> {
        let mut t = Attribution::new();
        for (k, v) in pairs {
            credit(&mut t, k.to_string(), *v);
        }
        t
    }

    #[test]
    fn test_top_two_of_three() {
        let t = totals(&[("A", 600), ("B", 300), ("C", 100)]);
        let top = top_n(&t, 1000, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].key, "A");
        assert_eq!(top[0].value, 600);
        assert!((top[0].percent - 60.0).abs() < 1e-9);
        assert_eq!(top[1].key, "B");
        assert!((top[1].percent - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_sorted_descending() {
        let t = totals(&[("low", 1), ("high", 50), ("mid", 10)]);
        let keys: Vec<_> = top_n(&t, 61, 10).into_iter().map(|r| r.key).collect();
        assert_eq!(keys, vec!["high", "mid", "low"]);
    }

    #[test]
    fn test_ties_are_stable() {
        let t = totals(&[("first", 5), ("second", 5), ("third", 5)]);
        let keys: Vec<_> = top_n(&t, 15, 3).into_iter().map(|r| r.key).collect();
        assert_eq!(keys, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_zero_total_gives_zero_percent() {
        let t = totals(&[("A", 10), ("B", 20)]);
        assert!(top_n(&t, 0, 10).iter().all(|r| r.percent == 0.0));
    }

    #[test]
    fn test_length_bounded_by_n_and_keys() {
        let t = totals(&[("A", 1), ("B", 2)]);
        assert_eq!(top_n(&t, 3, 10).len(), 2);
        assert_eq!(top_n(&t, 3, 1).len(), 1);
        assert!(top_n(&Attribution::<String>::new(), 0, 10).is_empty());
    }

    #[test]
    fn test_percentages_of_full_partition_sum_to_100() {
        let t = totals(&[("A", 25), ("B", 25), ("C", 50)]);
        let sum: f64 = top_n(&t, 100, 10).iter().map(|r| r.percent).sum();
        assert!((sum - 100.0).abs() < 1e-9);
        let partial: f64 = top_n(&t, 100, 2).iter().map(|r| r.percent).sum();
        assert!(partial < 100.0);
    }

    #[test]
    fn test_percent_is_clamped() {
        assert_eq!(percent_of(300, 100), 100.0);
        assert_eq!(percent_of(-5, 100), 0.0);
    }

    #[test]
    fn test_credit_accumulates_repeated_keys() {
        let t = totals(&[("f", 3), ("g", 1), ("f", 4)]);
        assert_eq!(t.get("f"), Some(&7));
        let order: Vec<_> = t.keys().map(String::as_str).collect();
        assert_eq!(order, vec!["f", "g"]);
    }

    #[test]
    fn test_credit_saturates() {
        let t = totals(&[("f", i64::MAX), ("f", 1)]);
        assert_eq!(t.get("f"), Some(&i64::MAX));
        let t = totals(&[("g", i64::MIN), ("g", -1)]);
        assert_eq!(t.get("g"), Some(&i64::MIN));
    }

    #[test]
    fn test_saturating_sum() {
        assert_eq!(saturating_sum([1, 2, 3]), 6);
        assert_eq!(saturating_sum([i64::MAX, 1]), i64::MAX);
        assert_eq!(saturating_sum(std::iter::empty()), 0);
    }
}
