//! Counter-to-distribution helpers used by evaluation reports
//!
//! The source this was distilled from built these over Python's
//! `collections.Counter`, branching on the key's runtime type to decide
//! whether avg/max/min make sense. Rust's static typing replaces that branch
//! with two concrete entry points: [`stats_from_int_counter`] for numeric
//! counters (counts of matches, counts of candidates) and
//! [`distribution_from_counter`] for anything else (score-range buckets).

use std::collections::BTreeMap;

/// Bucket `score` into a `"lower - upper"` 5%-step range, e.g.
/// `to_range(0.42, 5) == "40 - 45"`. Scores are usually in `[0, 1]` but
/// cosine-based scorings can go negative, so the bucket boundary below zero
/// must floor rather than truncate toward zero, e.g. `to_range(-0.42, 5) ==
/// "-45 - -40"`.
pub fn to_range(score: f64, step: u32) -> String {
    let step = step as i64;
    let scaled = (score * 100.0) as i64;
    let lower = scaled.div_euclid(step) * step;
    let upper = (lower + step).min(100);
    format!("{lower} - {upper}")
}

/// A running tally of occurrences per key, preserving insertion-agnostic
/// sorted order for reproducible report output.
#[derive(Debug, Clone, Default)]
pub struct Counter<K: Ord + Clone> {
    counts: BTreeMap<K, usize>,
}

impl<K: Ord + Clone> Counter<K> {
    pub fn new() -> Self {
        Self {
            counts: BTreeMap::new(),
        }
    }

    pub fn record(&mut self, key: K) {
        *self.counts.entry(key).or_insert(0) += 1;
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn distribution(&self) -> BTreeMap<K, usize> {
        self.counts.clone()
    }
}

/// Distribution plus avg/max/min, computed when the counted key is a
/// plain integer quantity (e.g. number of matches per query).
#[derive(Debug, Clone)]
pub struct IntStats {
    pub distribution: BTreeMap<i64, usize>,
    pub avg: f64,
    pub max: i64,
    pub min: i64,
}

/// `stats_from_counter` for integer-keyed counters.
pub fn stats_from_int_counter(counter: &Counter<i64>) -> Option<IntStats> {
    let distribution = counter.distribution();
    if distribution.is_empty() {
        return None;
    }
    let max = *distribution.keys().max().unwrap();
    let min = *distribution.keys().min().unwrap();
    let (weighted_sum, count) = distribution
        .iter()
        .fold((0i64, 0usize), |(sum, n), (k, v)| (sum + k * (*v as i64), n + v));
    let avg = weighted_sum as f64 / count as f64;
    Some(IntStats {
        distribution,
        avg,
        max,
        min,
    })
}

/// `stats_from_counter` for non-integer-keyed counters (range buckets):
/// distribution only, no avg/max/min.
pub fn distribution_from_counter<K: Ord + Clone>(counter: &Counter<K>) -> BTreeMap<K, usize> {
    counter.distribution()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_range_buckets_by_five_percent() {
        assert_eq!(to_range(0.0, 5), "0 - 5");
        assert_eq!(to_range(0.42, 5), "40 - 45");
        assert_eq!(to_range(0.999, 5), "95 - 100");
        assert_eq!(to_range(1.0, 5), "100 - 100");
    }

    #[test]
    fn to_range_floors_negative_scores() {
        assert_eq!(to_range(-0.42, 5), "-45 - -40");
        assert_eq!(to_range(-1.0, 5), "-100 - -95");
    }

    #[test]
    fn int_stats_computes_avg_max_min() {
        let mut counter = Counter::new();
        counter.record(2i64);
        counter.record(2);
        counter.record(4);
        let stats = stats_from_int_counter(&counter).unwrap();
        assert_eq!(stats.max, 4);
        assert_eq!(stats.min, 2);
        assert!((stats.avg - (2.0 + 2.0 + 4.0) / 3.0).abs() < 1e-9);
    }

    #[test]
    fn empty_int_counter_has_no_stats() {
        let counter: Counter<i64> = Counter::new();
        assert!(stats_from_int_counter(&counter).is_none());
    }

    #[test]
    fn string_distribution_has_no_stats_helper() {
        let mut counter: Counter<String> = Counter::new();
        counter.record("40 - 45".to_string());
        counter.record("40 - 45".to_string());
        let dist = distribution_from_counter(&counter);
        assert_eq!(dist.get("40 - 45"), Some(&2));
    }
}
