//! Similarity scoring between two embedded instances

use serde::Serialize;

use crate::transformer::Instance;
use crate::vector::cosine_similarity;

/// The outcome of scoring one instance against another.
#[derive(Debug, Clone, Serialize)]
pub struct Scoring {
    pub similarity_score: f64,
    pub is_similarity_match: bool,
    pub scored_tag: Option<String>,
}

impl Scoring {
    pub fn is_match(&self) -> bool {
        self.is_similarity_match
    }

    pub fn score(&self) -> f64 {
        self.similarity_score
    }
}

/// Computes a [`Scoring`] for a pair of instances.
///
/// The default metric is `1 - cosine_distance`, i.e. cosine similarity
/// itself, `nan_to_num`'d to `0.0` (never produced in practice since
/// [`cosine_similarity`] is itself NaN-free, but kept for parity with the
/// metric this was distilled from), compared against `score_to_be_match`.
pub struct ScoringCalculator {
    score_to_be_match: f64,
}

impl ScoringCalculator {
    pub fn new(score_to_be_match: f64) -> Self {
        Self { score_to_be_match }
    }

    pub fn score<V>(&self, query: &Instance<V>, other: &Instance<V>, scored_tag: Option<String>) -> Scoring {
        let raw = cosine_similarity(&query.embedding, &other.embedding);
        let similarity_score = if raw.is_nan() { 0.0 } else { raw };
        Scoring {
            is_similarity_match: similarity_score >= self.score_to_be_match,
            similarity_score,
            scored_tag,
        }
    }

    pub fn describe(&self) -> String {
        format!("default(score_to_be_match={})", self.score_to_be_match)
    }
}

impl Default for ScoringCalculator {
    fn default() -> Self {
        Self::new(0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_embeddings_score_one_and_match() {
        let calc = ScoringCalculator::default();
        let a = Instance::new((), vec![1.0, 0.0]);
        let b = Instance::new((), vec![1.0, 0.0]);
        let scoring = calc.score(&a, &b, Some("t".to_string()));
        assert!((scoring.score() - 1.0).abs() < 1e-9);
        assert!(scoring.is_match());
    }

    #[test]
    fn orthogonal_embeddings_score_zero_and_do_not_match() {
        let calc = ScoringCalculator::default();
        let a = Instance::new((), vec![1.0, 0.0]);
        let b = Instance::new((), vec![0.0, 1.0]);
        let scoring = calc.score(&a, &b, None);
        assert!((scoring.score() - 0.0).abs() < 1e-9);
        assert!(!scoring.is_match());
    }

    #[test]
    fn opposite_embeddings_score_negative_one_and_do_not_match() {
        let calc = ScoringCalculator::default();
        let a = Instance::new((), vec![1.0, 0.0]);
        let b = Instance::new((), vec![-1.0, 0.0]);
        let scoring = calc.score(&a, &b, None);
        assert!((scoring.score() + 1.0).abs() < 1e-9);
        assert!(!scoring.is_match());
    }

    #[test]
    fn custom_threshold_changes_match_outcome() {
        let calc = ScoringCalculator::new(-1.0);
        let a = Instance::new((), vec![1.0, 0.0]);
        let b = Instance::new((), vec![0.0, 1.0]);
        let scoring = calc.score(&a, &b, None);
        assert!(scoring.is_match(), "score of 0.0 clears threshold -1.0");
    }
}
