//! Covariance: running mean / covariance / std per cluster, Mahalanobis assignment

use std::collections::HashMap;

use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::vector::{identity, mahalanobis, mean, sample_covariance, std_norm};

use super::{ClusterId, ClusterProcessor, Description};

/// A single covariance cluster, tracking its full observation history so
/// mean/covariance/std can be recomputed exactly on every insert.
#[derive(Debug, Clone)]
pub struct Cluster {
    pub id: ClusterId,
    pub mean: Vec<f64>,
    pub covariance: Vec<Vec<f64>>,
    pub std: f64,
    pub observations: Vec<Vec<f64>>,
}

/// Mahalanobis-distance clustering processor.
///
/// `remove` is a deliberate no-op on cluster contents: the tag mapping is
/// dropped from [`CovarianceProcessor::get_cluster_by_tag`] but the
/// observation that backed it stays in the cluster's statistics forever.
/// This mirrors the original implementation's behavior exactly and is not a
/// bug — see the design notes for why it was kept rather than "fixed".
pub struct CovarianceProcessor {
    dimensions: usize,
    initial_std: f64,
    clusters: HashMap<ClusterId, Cluster>,
    tag_to_cluster: HashMap<String, ClusterId>,
    next_id: ClusterId,
}

impl CovarianceProcessor {
    /// Create a new processor for `dimensions`-wide embeddings, seeding
    /// every newly born cluster's `std` threshold at `initial_std`.
    pub fn new(dimensions: usize, initial_std: f64) -> EngineResult<Self> {
        if dimensions == 0 {
            return Err(EngineError::InvalidParameter(
                "Covariance dimensions must be > 0".to_string(),
            ));
        }
        if !(initial_std > 0.0) {
            return Err(EngineError::InvalidParameter(format!(
                "Covariance initial_std must be > 0, got {initial_std}"
            )));
        }
        Ok(Self {
            dimensions,
            initial_std,
            clusters: HashMap::new(),
            tag_to_cluster: HashMap::new(),
            next_id: 0,
        })
    }

    fn seed_cluster(&mut self, embedding: &[f64]) -> ClusterId {
        let id = self.next_id;
        self.next_id += 1;
        self.clusters.insert(
            id,
            Cluster {
                id,
                mean: embedding.to_vec(),
                covariance: identity(self.dimensions),
                std: self.initial_std,
                observations: vec![embedding.to_vec()],
            },
        );
        debug!(cluster_id = id, "Covariance cluster born");
        id
    }

    /// Mahalanobis distance from `embedding` to every live cluster, paired
    /// with the owning cluster id, in ascending id order for determinism.
    fn distances(&self, embedding: &[f64]) -> Vec<(ClusterId, f64)> {
        let mut ids: Vec<ClusterId> = self.clusters.keys().copied().collect();
        ids.sort_unstable();
        ids.into_iter()
            .map(|id| {
                let cluster = &self.clusters[&id];
                let d = mahalanobis(embedding, &cluster.mean, &cluster.covariance);
                (id, d)
            })
            .collect()
    }

    fn nearest(&self, embedding: &[f64]) -> Option<(ClusterId, f64)> {
        self.distances(embedding)
            .into_iter()
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
    }

    fn absorb(&mut self, cluster_id: ClusterId, embedding: &[f64]) {
        let cluster = self.clusters.get_mut(&cluster_id).unwrap();
        cluster.observations.push(embedding.to_vec());
        cluster.mean = mean(&cluster.observations);
        cluster.covariance = sample_covariance(&cluster.observations);
        cluster.std = std_norm(&cluster.observations);
    }

    /// Read-only access to a cluster, for evaluation and tests.
    pub fn cluster(&self, id: ClusterId) -> Option<&Cluster> {
        self.clusters.get(&id)
    }
}

impl ClusterProcessor for CovarianceProcessor {
    fn process(&mut self, tag: &str, embedding: &[f64]) {
        let cluster_id = if self.clusters.is_empty() {
            self.seed_cluster(embedding)
        } else {
            let (nearest_id, distance) = self.nearest(embedding).unwrap();
            let threshold = self.clusters[&nearest_id].std;
            if distance < threshold {
                self.absorb(nearest_id, embedding);
                nearest_id
            } else {
                self.seed_cluster(embedding)
            }
        };
        self.tag_to_cluster.insert(tag.to_string(), cluster_id);
    }

    fn update(&mut self, tag: &str, embedding: &[f64]) {
        self.remove(tag);
        self.process(tag, embedding);
    }

    fn remove(&mut self, tag: &str) {
        // Deliberately does not touch cluster contents; see struct docs.
        self.tag_to_cluster.remove(tag);
    }

    fn predict(&self, embedding: &[f64]) -> Option<ClusterId> {
        self.nearest(embedding).map(|(id, _)| id)
    }

    fn get_cluster_by_tag(&self, tag: &str) -> Option<ClusterId> {
        self.tag_to_cluster.get(tag).copied()
    }

    fn get_tags_in_cluster(&self, cluster_id: ClusterId) -> Vec<String> {
        let mut tags: Vec<String> = self
            .tag_to_cluster
            .iter()
            .filter(|(_, &id)| id == cluster_id)
            .map(|(tag, _)| tag.clone())
            .collect();
        tags.sort();
        tags
    }

    fn get_cluster_ids(&self) -> Vec<ClusterId> {
        let mut ids: Vec<ClusterId> = self.clusters.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    fn describe(&self) -> Description {
        Description {
            name: "Covariance".to_string(),
            parameters: vec![
                ("dimensions".to_string(), self.dimensions as f64),
                ("initial_std".to_string(), self.initial_std),
            ],
        }
    }

    fn safe_file_name(&self) -> String {
        format!(
            "Covariance = dimensions={}, initial_std={}",
            self.dimensions, self.initial_std
        )
    }
}
