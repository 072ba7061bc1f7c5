//! Cluster-quality and match-quality reporting
//!
//! Both reports are read-only: they walk the facade's state through the
//! `ClusterProcessor` trait and the stored instances, computing summary
//! statistics without mutating anything.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::processors::{ClusterId, ClusterProcessor};
use crate::scoring::Scoring;
use crate::stats::{stats_from_int_counter, to_range, Counter};
use crate::transformer::Instance;
use crate::vector::{cosine_similarity, euclidean};

/// Silhouette score, a custom cluster-cohesion score, and size statistics
/// over the clusters a processor currently holds.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterReport {
    pub silhouette: f64,
    pub cluster_score: f64,
    pub cluster_count: usize,
    pub instance_count: usize,
    pub instances_per_cluster: BTreeMap<i64, usize>,
    pub avg_instances_per_cluster: Option<f64>,
    pub max_instances_per_cluster: Option<i64>,
    pub min_instances_per_cluster: Option<i64>,
}

/// Evaluate cluster quality for every instance currently owned by
/// `processor`, reading embeddings back out of `instances`.
pub fn evaluate_clusters<V>(
    instances: &std::collections::HashMap<String, Instance<V>>,
    processor: &dyn ClusterProcessor,
) -> ClusterReport {
    let tags: Vec<String> = instances.keys().cloned().collect();
    let points: Vec<Vec<f64>> = tags.iter().map(|t| instances[t].embedding.clone()).collect();
    let labels: Vec<ClusterId> = tags
        .iter()
        .map(|tag| processor.get_cluster_by_tag(tag).expect("instance missing its cluster"))
        .collect();

    let silhouette = silhouette_score(&points, &labels);
    let cluster_score = compute_cluster_score(processor, instances);

    let distinct_labels: HashSet<ClusterId> = labels.iter().copied().collect();

    let mut counter: Counter<i64> = Counter::new();
    for cluster_id in processor.get_cluster_ids() {
        let n = processor.get_tags_in_cluster(cluster_id).len();
        if n > 0 {
            counter.record(n as i64);
        }
    }
    let int_stats = stats_from_int_counter(&counter);

    ClusterReport {
        silhouette,
        cluster_score,
        cluster_count: distinct_labels.len(),
        instance_count: tags.len(),
        instances_per_cluster: counter.distribution(),
        avg_instances_per_cluster: int_stats.as_ref().map(|s| s.avg),
        max_instances_per_cluster: int_stats.as_ref().map(|s| s.max),
        min_instances_per_cluster: int_stats.as_ref().map(|s| s.min),
    }
}

/// `Σ_c exp(−Δ_c²)·ln(n_c)` over every non-empty cluster, where `Δ_c =
/// ((σ/μ) − 1) / (√5/5)` is computed over the all-pairs cosine-similarity
/// distribution within the cluster (`[1.0]` for a single-tag cluster).
fn compute_cluster_score<V>(
    processor: &dyn ClusterProcessor,
    instances: &std::collections::HashMap<String, Instance<V>>,
) -> f64 {
    let mut total = 0.0;
    for cluster_id in processor.get_cluster_ids() {
        let tags = processor.get_tags_in_cluster(cluster_id);
        let n = tags.len();
        if n == 0 {
            continue;
        }
        let similarities: Vec<f64> = if n == 1 {
            vec![1.0]
        } else {
            let mut sims = Vec::with_capacity(n * (n - 1) / 2);
            for i in 0..tags.len() - 1 {
                for j in (i + 1)..tags.len() {
                    let a = &instances[&tags[i]].embedding;
                    let b = &instances[&tags[j]].embedding;
                    sims.push(cosine_similarity(a, b));
                }
            }
            sims
        };

        let mean: f64 = similarities.iter().sum::<f64>() / similarities.len() as f64;
        let variance: f64 =
            similarities.iter().map(|s| (s - mean) * (s - mean)).sum::<f64>() / similarities.len() as f64;
        let std = variance.sqrt();
        let dispersion = if mean == 0.0 { 0.0 } else { std / mean };
        let delta = (dispersion - 1.0) / (5.0_f64.sqrt() / 5.0);
        let node_score = (-(delta * delta)).exp() * (n as f64).ln();
        total += node_score;
    }
    total
}

/// Mean silhouette coefficient over Euclidean distance in embedding space.
/// Returns `-1.0` when fewer than 2 distinct labels are present, matching
/// the degenerate-input behavior of the metric this was distilled from.
fn silhouette_score(points: &[Vec<f64>], labels: &[ClusterId]) -> f64 {
    let n = points.len();
    if n < 2 {
        return -1.0;
    }
    let distinct: HashSet<ClusterId> = labels.iter().copied().collect();
    if distinct.len() < 2 {
        return -1.0;
    }

    let mut sample_scores = Vec::with_capacity(n);
    for i in 0..n {
        let label_i = labels[i];
        let same_cluster: Vec<usize> = (0..n).filter(|&j| j != i && labels[j] == label_i).collect();

        if same_cluster.is_empty() {
            // Singleton cluster: silhouette for this sample is defined as 0.
            sample_scores.push(0.0);
            continue;
        }

        let a = same_cluster.iter().map(|&j| euclidean(&points[i], &points[j])).sum::<f64>()
            / same_cluster.len() as f64;

        let mut b = f64::INFINITY;
        for &other_label in &distinct {
            if other_label == label_i {
                continue;
            }
            let other_cluster: Vec<usize> = (0..n).filter(|&j| labels[j] == other_label).collect();
            if other_cluster.is_empty() {
                continue;
            }
            let mean_dist = other_cluster.iter().map(|&j| euclidean(&points[i], &points[j])).sum::<f64>()
                / other_cluster.len() as f64;
            b = b.min(mean_dist);
        }

        let denom = a.max(b);
        sample_scores.push(if denom == 0.0 { 0.0 } else { (b - a) / denom });
    }

    sample_scores.iter().sum::<f64>() / sample_scores.len() as f64
}

/// Per-query match detail, included in [`MatchReport::by_instance`] only
/// when the caller asked for it.
#[derive(Debug, Clone, Serialize)]
pub struct QueryMatchDetail<V> {
    pub value: V,
    pub match_count: usize,
    pub potential_count: usize,
    pub average_score: f64,
    pub average_match_score: f64,
    pub matches: Vec<Scoring>,
}

/// Aggregate match-quality report across a batch of queries.
#[derive(Debug, Clone, Serialize)]
pub struct MatchReport<V> {
    pub match_count_distribution: BTreeMap<i64, usize>,
    pub avg_match_count: Option<f64>,
    pub max_match_count: Option<i64>,
    pub min_match_count: Option<i64>,

    pub matches_score_range_distribution: BTreeMap<String, usize>,
    pub average_matches_score_range_distribution: BTreeMap<String, usize>,

    pub percent_at_least_one_match: f64,

    pub potential_count_distribution: BTreeMap<i64, usize>,
    pub avg_potential_count: Option<f64>,
    pub max_potential_count: Option<i64>,
    pub min_potential_count: Option<i64>,

    pub score_range_distribution: BTreeMap<String, usize>,
    pub average_score_range_distribution: BTreeMap<String, usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub by_instance: Option<Vec<QueryMatchDetail<V>>>,
}

/// Evaluate match quality for a batch of queries given each query's
/// already-computed scorings (e.g. from `Engine::get_scorings_for`).
pub fn evaluate_matches<V: Clone>(
    queried_instances: &[Instance<V>],
    scorings_per_query: &[Vec<Scoring>],
    fetch_instance: bool,
) -> MatchReport<V> {
    let mut num_matches: Counter<i64> = Counter::new();
    let mut num_potential: Counter<i64> = Counter::new();
    let mut matches_score_range: Counter<String> = Counter::new();
    let mut score_range: Counter<String> = Counter::new();
    let mut avg_matches_score_range: Counter<String> = Counter::new();
    let mut avg_score_range: Counter<String> = Counter::new();

    let mut by_instance = Vec::with_capacity(queried_instances.len());

    for (instance, scorings) in queried_instances.iter().zip(scorings_per_query) {
        let matches: Vec<Scoring> = scorings.iter().filter(|s| s.is_match()).cloned().collect();
        let match_scores: Vec<f64> = matches.iter().map(|s| s.score()).collect();
        let all_scores: Vec<f64> = scorings.iter().map(|s| s.score()).collect();

        let average_score = if all_scores.is_empty() {
            0.0
        } else {
            all_scores.iter().sum::<f64>() / all_scores.len() as f64
        };
        let average_match_score = if match_scores.is_empty() {
            0.0
        } else {
            match_scores.iter().sum::<f64>() / match_scores.len() as f64
        };

        num_matches.record(match_scores.len() as i64);
        num_potential.record(scorings.len() as i64);

        for m in &match_scores {
            matches_score_range.record(to_range(*m, 5));
        }
        for s in &all_scores {
            score_range.record(to_range(*s, 5));
        }
        if !match_scores.is_empty() {
            avg_matches_score_range.record(to_range(average_match_score, 5));
        }
        avg_score_range.record(to_range(average_score, 5));

        by_instance.push(QueryMatchDetail {
            value: instance.value.clone(),
            match_count: match_scores.len(),
            potential_count: scorings.len(),
            average_score,
            average_match_score,
            matches,
        });
    }

    let match_stats = stats_from_int_counter(&num_matches);
    let potential_stats = stats_from_int_counter(&num_potential);

    let total_queries = queried_instances.len().max(1) as f64;
    let zero_match_queries = num_matches.distribution().get(&0).copied().unwrap_or(0) as f64;
    let percent_at_least_one_match = (1.0 - zero_match_queries / total_queries) * 100.0;

    MatchReport {
        match_count_distribution: num_matches.distribution(),
        avg_match_count: match_stats.as_ref().map(|s| s.avg),
        max_match_count: match_stats.as_ref().map(|s| s.max),
        min_match_count: match_stats.as_ref().map(|s| s.min),

        matches_score_range_distribution: matches_score_range.distribution(),
        average_matches_score_range_distribution: avg_matches_score_range.distribution(),

        percent_at_least_one_match,

        potential_count_distribution: num_potential.distribution(),
        avg_potential_count: potential_stats.as_ref().map(|s| s.avg),
        max_potential_count: potential_stats.as_ref().map(|s| s.max),
        min_potential_count: potential_stats.as_ref().map(|s| s.min),

        score_range_distribution: score_range.distribution(),
        average_score_range_distribution: avg_score_range.distribution(),

        by_instance: if fetch_instance { Some(by_instance) } else { None },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silhouette_is_negative_one_for_single_cluster() {
        let points = vec![vec![0.0, 0.0], vec![1.0, 1.0], vec![2.0, 2.0]];
        let labels = vec![0u64, 0, 0];
        assert_eq!(silhouette_score(&points, &labels), -1.0);
    }

    #[test]
    fn silhouette_is_high_for_well_separated_clusters() {
        let points = vec![
            vec![0.0, 0.0],
            vec![0.1, 0.1],
            vec![10.0, 10.0],
            vec![10.1, 10.1],
        ];
        let labels = vec![0u64, 0, 1, 1];
        let score = silhouette_score(&points, &labels);
        assert!(score > 0.9, "expected near-1.0 silhouette, got {score}");
    }

    #[test]
    fn percent_at_least_one_match_is_100_when_everyone_matches() {
        let scoring = Scoring {
            similarity_score: 1.0,
            is_similarity_match: true,
            scored_tag: None,
        };
        let instances = vec![Instance::new((), vec![1.0]), Instance::new((), vec![1.0])];
        let scorings = vec![vec![scoring.clone()], vec![scoring]];
        let report = evaluate_matches(&instances, &scorings, false);
        assert_eq!(report.percent_at_least_one_match, 100.0);
        assert!(report.by_instance.is_none());
    }

    #[test]
    fn by_instance_is_populated_only_when_requested() {
        let scoring = Scoring {
            similarity_score: 0.1,
            is_similarity_match: false,
            scored_tag: None,
        };
        let instances = vec![Instance::new((), vec![1.0])];
        let scorings = vec![vec![scoring]];
        let report = evaluate_matches(&instances, &scorings, true);
        assert_eq!(report.by_instance.unwrap().len(), 1);
    }
}
