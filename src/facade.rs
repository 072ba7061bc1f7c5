//! The orchestrating facade: tag→instance map, processor routing, scoring
//!
//! This is the crate's single entry point for callers. It never implements
//! clustering math itself — every mutation is forwarded to exactly one
//! [`ProcessorKind`] — and it owns the only copy of each tag's original
//! value, so processors only ever see embeddings.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::{EngineError, EngineResult};
use crate::evaluation::{self, ClusterReport, MatchReport};
use crate::processors::{ClusterProcessor, ProcessorKind};
use crate::scoring::{Scoring, ScoringCalculator};
use crate::transformer::{Instance, Transformer};

/// Value-to-embedding transformers keyed by the name callers pass in
/// `Operation`/`add`/`update` calls.
pub type TransformerRegistry<V> = HashMap<String, Box<dyn Transformer<V>>>;

/// Static summary of an engine's configuration, for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct EngineDescription {
    pub transformers: Vec<String>,
    pub scoring_calculator: String,
}

/// Orchestrates one clustering processor behind a tag→instance map.
///
/// Generic over the caller's payload type `V`; the engine only ever reads
/// `Instance<V>.embedding`, so `V` carries no bound beyond what a given
/// transformer or scoring calculator needs.
pub struct Engine<V> {
    processor: ProcessorKind,
    transformers: TransformerRegistry<V>,
    scoring_calculator: ScoringCalculator,
    instances_map: HashMap<String, Instance<V>>,
    dimensions: Option<usize>,
}

impl<V: Clone> Engine<V> {
    /// Build a new engine around `processor`, with an empty transformer
    /// registry and the default scoring calculator.
    pub fn new(processor: ProcessorKind) -> Self {
        Self {
            processor,
            transformers: HashMap::new(),
            scoring_calculator: ScoringCalculator::default(),
            instances_map: HashMap::new(),
            dimensions: None,
        }
    }

    /// Replace the scoring calculator (builder-style).
    pub fn with_scoring_calculator(mut self, scoring_calculator: ScoringCalculator) -> Self {
        self.scoring_calculator = scoring_calculator;
        self
    }

    /// Register a named transformer, replacing any previous one under the
    /// same key.
    pub fn register_transformer(&mut self, key: impl Into<String>, transformer: Box<dyn Transformer<V>>) {
        self.transformers.insert(key.into(), transformer);
    }

    fn create_instance(&self, transformer_key: &str, value: V) -> Option<Instance<V>> {
        self.transformers.get(transformer_key).map(|t| t.transform(value))
    }

    /// Pin or check the embedding dimension against the first instance ever
    /// added. No mutation happens before this succeeds.
    fn check_dimension(&mut self, embedding: &[f64]) -> EngineResult<()> {
        match self.dimensions {
            None => {
                self.dimensions = Some(embedding.len());
                Ok(())
            }
            Some(expected) if expected == embedding.len() => Ok(()),
            Some(expected) => Err(EngineError::InvalidDimension {
                expected,
                actual: embedding.len(),
            }),
        }
    }

    /// Embed `value` via the transformer registered under `transformer_key`
    /// and insert it under `tag`. Returns `Ok(false)` if the transformer key
    /// is unknown; errors if `value`'s embedding dimension does not match
    /// every other instance already in the engine.
    pub fn add(&mut self, tag: impl Into<String>, transformer_key: &str, value: V) -> EngineResult<bool> {
        match self.create_instance(transformer_key, value) {
            Some(instance) => {
                self.add_instance(tag, instance)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Insert an already-built instance directly, bypassing transformers.
    pub fn add_instance(&mut self, tag: impl Into<String>, instance: Instance<V>) -> EngineResult<()> {
        self.check_dimension(&instance.embedding)?;
        let tag = tag.into();
        self.processor.process(&tag, &instance.embedding);
        self.instances_map.insert(tag, instance);
        Ok(())
    }

    /// Re-embed `value` for an existing `tag`. Returns `Ok(false)` if `tag`
    /// is unknown or the transformer key is unknown.
    pub fn update(&mut self, tag: &str, transformer_key: &str, value: V) -> EngineResult<bool> {
        match self.create_instance(transformer_key, value) {
            Some(instance) => self.update_instance(tag, instance),
            None => Ok(false),
        }
    }

    /// Replace the instance stored under `tag` with `instance`. Returns
    /// `Ok(false)` if `tag` is unknown.
    pub fn update_instance(&mut self, tag: &str, instance: Instance<V>) -> EngineResult<bool> {
        if !self.instances_map.contains_key(tag) {
            return Ok(false);
        }
        self.check_dimension(&instance.embedding)?;
        self.processor.update(tag, &instance.embedding);
        self.instances_map.insert(tag.to_string(), instance);
        Ok(true)
    }

    /// Detach `tag`. Returns `false` if `tag` is unknown.
    pub fn remove(&mut self, tag: &str) -> bool {
        if !self.instances_map.contains_key(tag) {
            return false;
        }
        self.processor.remove(tag);
        self.instances_map.remove(tag);
        true
    }

    /// Score `value` against every member of the cluster it would join,
    /// without mutating the engine. `None` on an unknown transformer key.
    pub fn get_scorings_for(&self, transformer_key: &str, value: V) -> Option<Vec<Scoring>> {
        self.create_instance(transformer_key, value)
            .map(|instance| self.get_scorings_for_instance(&instance))
    }

    /// As [`Engine::get_scorings_for`], given an already-built instance.
    pub fn get_scorings_for_instance(&self, instance: &Instance<V>) -> Vec<Scoring> {
        if self.instances_map.is_empty() {
            return Vec::new();
        }
        let would_be_cluster = self.processor.predict(&instance.embedding).expect(
            "predict on a non-empty engine must yield a cluster",
        );
        let tags = self.processor.get_tags_in_cluster(would_be_cluster);

        tags.into_iter()
            .filter_map(|tag| {
                let other = self.instances_map.get(&tag)?;
                let mut scoring = self.scoring_calculator.score(instance, other, Some(tag.clone()));
                scoring.scored_tag = Some(tag);
                Some(scoring)
            })
            .collect()
    }

    /// As [`Engine::get_scorings_for`], filtered to matches only.
    pub fn get_matches_for(&self, transformer_key: &str, value: V) -> Option<Vec<Scoring>> {
        self.get_scorings_for(transformer_key, value)
            .map(|scorings| scorings.into_iter().filter(|s| s.is_match()).collect())
    }

    /// As [`Engine::get_matches_for`], given an already-built instance.
    pub fn get_matches_for_instance(&self, instance: &Instance<V>) -> Vec<Scoring> {
        self.get_scorings_for_instance(instance)
            .into_iter()
            .filter(|s| s.is_match())
            .collect()
    }

    /// Look up stored instances by tag, silently skipping unknown tags.
    pub fn get_instances_by_tag(&self, tags: &[String]) -> Vec<&Instance<V>> {
        tags.iter().filter_map(|tag| self.instances_map.get(tag)).collect()
    }

    /// Number of instances currently tracked.
    pub fn len(&self) -> usize {
        self.instances_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances_map.is_empty()
    }

    /// Cluster-quality report over every instance currently owned.
    pub fn evaluate_clusters(&self) -> ClusterReport {
        evaluation::evaluate_clusters(&self.instances_map, &self.processor)
    }

    /// Match-quality report for a batch of already-scored query instances.
    pub fn evaluate_matches(
        &self,
        queries: &[Instance<V>],
        fetch_instance: bool,
    ) -> MatchReport<V> {
        let scorings: Vec<Vec<Scoring>> = queries
            .iter()
            .map(|instance| self.get_scorings_for_instance(instance))
            .collect();
        evaluation::evaluate_matches(queries, &scorings, fetch_instance)
    }

    /// Registered transformer names and the scoring calculator's
    /// description, for external reporting.
    pub fn describe(&self) -> EngineDescription {
        let mut transformers: Vec<String> = self.transformers.keys().cloned().collect();
        transformers.sort();
        EngineDescription {
            transformers,
            scoring_calculator: self.scoring_calculator.describe(),
        }
    }
}
