//! ECM: Evolving Clustering Method — hyper-sphere clusters, one-pass assignment

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::error::{EngineError, EngineResult};
use crate::vector::euclidean;

use super::{ClusterId, ClusterProcessor, Description};

/// A single hyper-sphere cluster.
#[derive(Debug, Clone)]
pub struct Cluster {
    pub id: ClusterId,
    pub center: Vec<f64>,
    pub radius: f64,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SearchResult {
    Radius,
    Threshold,
    Outside,
}

struct Search {
    result: SearchResult,
    index: ClusterId,
    distance: f64,
}

/// Hyper-sphere clustering with adaptive center/radius and one-pass
/// assignment.
pub struct EcmProcessor {
    distance_threshold: f64,
    clusters: HashMap<ClusterId, Cluster>,
    tag_to_cluster: HashMap<String, ClusterId>,
    next_id: ClusterId,

    // Parallel cache, invalidated on every mutation and lazily rebuilt.
    cached_ids: Vec<ClusterId>,
    cached_centers: Vec<Vec<f64>>,
    cached_radii: Vec<f64>,
}

impl EcmProcessor {
    /// Create a new ECM processor with distance threshold `Dth > 0`.
    pub fn new(distance_threshold: f64) -> EngineResult<Self> {
        if !(distance_threshold > 0.0) {
            return Err(EngineError::InvalidParameter(format!(
                "ECM distance_threshold must be > 0, got {distance_threshold}"
            )));
        }
        Ok(Self {
            distance_threshold,
            clusters: HashMap::new(),
            tag_to_cluster: HashMap::new(),
            next_id: 0,
            cached_ids: Vec::new(),
            cached_centers: Vec::new(),
            cached_radii: Vec::new(),
        })
    }

    fn invalidate_cache(&mut self) {
        self.cached_ids.clear();
        self.cached_centers.clear();
        self.cached_radii.clear();
    }

    fn ensure_cache(&mut self) {
        if self.cached_ids.is_empty() && !self.clusters.is_empty() {
            // Deterministic order keeps search ties reproducible.
            let mut ids: Vec<ClusterId> = self.clusters.keys().copied().collect();
            ids.sort_unstable();
            for id in ids {
                let cluster = &self.clusters[&id];
                self.cached_ids.push(id);
                self.cached_centers.push(cluster.center.clone());
                self.cached_radii.push(cluster.radius);
            }
        }
    }

    fn search(&mut self, embedding: &[f64]) -> Option<Search> {
        self.ensure_cache();
        if self.cached_ids.is_empty() {
            return None;
        }

        let distances: Vec<f64> = self
            .cached_centers
            .iter()
            .map(|c| euclidean(embedding, c))
            .collect();

        let within_radius: Vec<usize> = (0..distances.len())
            .filter(|&i| distances[i] <= self.cached_radii[i])
            .collect();

        if let Some(&best) = within_radius
            .iter()
            .min_by(|&&a, &&b| distances[a].partial_cmp(&distances[b]).unwrap())
        {
            return Some(Search {
                result: SearchResult::Radius,
                index: self.cached_ids[best],
                distance: distances[best],
            });
        }

        let sums: Vec<f64> = distances
            .iter()
            .zip(&self.cached_radii)
            .map(|(d, r)| d + r)
            .collect();
        let best = (0..sums.len())
            .min_by(|&a, &b| sums[a].partial_cmp(&sums[b]).unwrap())
            .unwrap();
        let s_star = sums[best];

        let result = if s_star > 2.0 * self.distance_threshold {
            SearchResult::Outside
        } else {
            SearchResult::Threshold
        };

        Some(Search {
            result,
            index: self.cached_ids[best],
            distance: s_star,
        })
    }

    fn create_cluster(&mut self, tag: &str, embedding: &[f64]) -> ClusterId {
        let id = self.next_id;
        self.next_id += 1;
        self.clusters.insert(
            id,
            Cluster {
                id,
                center: embedding.to_vec(),
                radius: 0.0,
                tags: vec![tag.to_string()],
            },
        );
        debug!(cluster_id = id, tag, "ECM cluster born");
        id
    }

    /// Move the center toward `embedding` so it lands exactly on the
    /// boundary at the new radius (`THRESHOLD` adaptation).
    fn adapt(cluster: &mut Cluster, distance: f64, embedding: &[f64]) {
        let direction: Vec<f64> = embedding
            .iter()
            .zip(&cluster.center)
            .map(|(e, c)| e - c)
            .collect();
        let norm: f64 = direction.iter().map(|x| x * x).sum::<f64>().sqrt();
        let new_radius = distance / 2.0;
        cluster.radius = new_radius;
        if norm > 0.0 {
            cluster.center = embedding
                .iter()
                .zip(&direction)
                .map(|(e, d)| e - (d / norm) * new_radius)
                .collect();
        }
        // `norm == 0.0` means the triggering embedding already sits at the
        // old center; center stays put, only the radius grows.
    }

    fn remove_from_cluster(&mut self, cluster_id: ClusterId, tag: &str) {
        let mut delete = false;
        if let Some(cluster) = self.clusters.get_mut(&cluster_id) {
            cluster.tags.retain(|t| t != tag);
            delete = cluster.tags.is_empty();
        }
        if delete {
            self.clusters.remove(&cluster_id);
            debug!(cluster_id, "ECM cluster emptied and removed");
        } else {
            trace!(cluster_id, tag, "tag detached from ECM cluster");
        }
    }

    /// Read-only access to a cluster, for evaluation and tests.
    pub fn cluster(&self, id: ClusterId) -> Option<&Cluster> {
        self.clusters.get(&id)
    }
}

impl ClusterProcessor for EcmProcessor {
    fn process(&mut self, tag: &str, embedding: &[f64]) {
        let cluster_id = if self.clusters.is_empty() {
            self.create_cluster(tag, embedding)
        } else {
            let search = self.search(embedding).expect("non-empty clusters search");
            match search.result {
                SearchResult::Radius => {
                    let cluster = self.clusters.get_mut(&search.index).unwrap();
                    cluster.tags.push(tag.to_string());
                    search.index
                }
                SearchResult::Threshold => {
                    let cluster = self.clusters.get_mut(&search.index).unwrap();
                    cluster.tags.push(tag.to_string());
                    Self::adapt(cluster, search.distance, embedding);
                    search.index
                }
                SearchResult::Outside => self.create_cluster(tag, embedding),
            }
        };
        self.tag_to_cluster.insert(tag.to_string(), cluster_id);
        self.invalidate_cache();
    }

    fn update(&mut self, tag: &str, embedding: &[f64]) {
        let old_id = *self
            .tag_to_cluster
            .get(tag)
            .expect("update on unknown tag is undefined");
        let search = self.search(embedding).expect("non-empty clusters search");

        let new_id = match search.result {
            SearchResult::Outside => {
                self.remove_from_cluster(old_id, tag);
                self.create_cluster(tag, embedding)
            }
            SearchResult::Radius => {
                if search.index == old_id {
                    // In-place: radius membership never changes geometry.
                    search.index
                } else {
                    self.remove_from_cluster(old_id, tag);
                    let cluster = self.clusters.get_mut(&search.index).unwrap();
                    cluster.tags.push(tag.to_string());
                    search.index
                }
            }
            SearchResult::Threshold => {
                if search.index == old_id {
                    let cluster = self.clusters.get_mut(&old_id).unwrap();
                    Self::adapt(cluster, search.distance, embedding);
                    search.index
                } else {
                    self.remove_from_cluster(old_id, tag);
                    let cluster = self.clusters.get_mut(&search.index).unwrap();
                    cluster.tags.push(tag.to_string());
                    Self::adapt(cluster, search.distance, embedding);
                    search.index
                }
            }
        };

        self.tag_to_cluster.insert(tag.to_string(), new_id);
        self.invalidate_cache();
    }

    fn remove(&mut self, tag: &str) {
        if let Some(cluster_id) = self.tag_to_cluster.remove(tag) {
            self.remove_from_cluster(cluster_id, tag);
            self.invalidate_cache();
        }
    }

    fn predict(&self, embedding: &[f64]) -> Option<ClusterId> {
        // `search` needs `&mut self` only to populate the lazy cache; clone
        // the minimal state rather than widen the public signature to
        // `&mut self`, since prediction must not observably mutate.
        let mut scratch = EcmProcessor {
            distance_threshold: self.distance_threshold,
            clusters: self.clusters.clone(),
            tag_to_cluster: HashMap::new(),
            next_id: self.next_id,
            cached_ids: self.cached_ids.clone(),
            cached_centers: self.cached_centers.clone(),
            cached_radii: self.cached_radii.clone(),
        };
        scratch.search(embedding).map(|s| s.index)
    }

    fn get_cluster_by_tag(&self, tag: &str) -> Option<ClusterId> {
        self.tag_to_cluster.get(tag).copied()
    }

    fn get_tags_in_cluster(&self, cluster_id: ClusterId) -> Vec<String> {
        self.clusters
            .get(&cluster_id)
            .map(|c| c.tags.clone())
            .unwrap_or_default()
    }

    fn get_cluster_ids(&self) -> Vec<ClusterId> {
        let mut ids: Vec<ClusterId> = self.clusters.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    fn describe(&self) -> Description {
        Description {
            name: "ECM".to_string(),
            parameters: vec![("distance_threshold".to_string(), self.distance_threshold)],
        }
    }

    fn safe_file_name(&self) -> String {
        format!("ECM = distance_threshold={}", self.distance_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_threshold() {
        assert!(EcmProcessor::new(0.0).is_err());
        assert!(EcmProcessor::new(-1.0).is_err());
        assert!(EcmProcessor::new(0.5).is_ok());
    }

    #[test]
    fn first_point_creates_cluster_with_zero_radius() {
        let mut ecm = EcmProcessor::new(0.5).unwrap();
        ecm.process("t1", &[1.0, 1.0]);
        let id = ecm.get_cluster_by_tag("t1").unwrap();
        let cluster = ecm.cluster(id).unwrap();
        assert_eq!(cluster.radius, 0.0);
        assert_eq!(cluster.center, vec![1.0, 1.0]);
    }

    // S1: THRESHOLD merges, OUTSIDE splits, THRESHOLD merges again.
    #[test]
    fn scenario_s1_four_points() {
        let mut ecm = EcmProcessor::new(0.5).unwrap();
        ecm.process("t1", &[1.0, 1.0]);
        let c0 = ecm.get_cluster_by_tag("t1").unwrap();
        assert_eq!(ecm.cluster(c0).unwrap().radius, 0.0);

        ecm.process("t2", &[1.0, 2.0]);
        let c_t2 = ecm.get_cluster_by_tag("t2").unwrap();
        assert_eq!(c_t2, c0, "t2 should join the same cluster via THRESHOLD");
        let cluster = ecm.cluster(c0).unwrap();
        assert!((cluster.radius - 0.5).abs() < 1e-9);
        // New point lies exactly on the boundary.
        let dist = euclidean(&[1.0, 2.0], &cluster.center);
        assert!((dist - cluster.radius).abs() < 1e-9);

        ecm.process("t3", &[1.0, 3.0]);
        let c_t3 = ecm.get_cluster_by_tag("t3").unwrap();
        assert_ne!(c_t3, c0, "t3 triggers OUTSIDE: a new cluster");

        ecm.process("t4", &[1.0, 4.0]);
        let c_t4 = ecm.get_cluster_by_tag("t4").unwrap();
        assert_eq!(c_t4, c_t3, "t4 attaches to t3's cluster via THRESHOLD");
    }

    // S3: predict lands on the nearest existing cluster without mutating.
    #[test]
    fn scenario_s3_predict_after_s1() {
        let mut ecm = EcmProcessor::new(0.5).unwrap();
        ecm.process("t1", &[1.0, 1.0]);
        ecm.process("t2", &[1.0, 2.0]);
        ecm.process("t3", &[1.0, 3.0]);
        ecm.process("t4", &[1.0, 4.0]);

        let predicted = ecm.predict(&[1.0, 2.5]).unwrap();
        assert_eq!(predicted, ecm.get_cluster_by_tag("t2").unwrap());
    }

    #[test]
    fn identical_embeddings_keep_radius_zero() {
        let mut ecm = EcmProcessor::new(0.5).unwrap();
        ecm.process("t1", &[2.0, 2.0]);
        ecm.process("t2", &[2.0, 2.0]);
        ecm.process("t3", &[2.0, 2.0]);

        let id = ecm.get_cluster_by_tag("t1").unwrap();
        assert_eq!(ecm.get_cluster_by_tag("t2"), Some(id));
        assert_eq!(ecm.get_cluster_by_tag("t3"), Some(id));
        assert_eq!(ecm.cluster(id).unwrap().radius, 0.0);
    }

    #[test]
    fn remove_deletes_emptied_cluster() {
        let mut ecm = EcmProcessor::new(0.5).unwrap();
        ecm.process("t1", &[1.0, 1.0]);
        let id = ecm.get_cluster_by_tag("t1").unwrap();
        ecm.remove("t1");
        assert_eq!(ecm.get_cluster_by_tag("t1"), None);
        assert!(ecm.cluster(id).is_none());
        assert!(ecm.get_cluster_ids().is_empty());
    }

    #[test]
    fn update_in_same_cluster_adapts_without_detaching() {
        let mut ecm = EcmProcessor::new(5.0).unwrap();
        ecm.process("t1", &[0.0, 0.0]);
        ecm.process("t2", &[1.0, 0.0]);
        let before = ecm.get_cluster_by_tag("t2").unwrap();

        ecm.update("t2", &[1.5, 0.0]);
        let after = ecm.get_cluster_by_tag("t2").unwrap();
        assert_eq!(before, after);
        assert!(ecm.get_tags_in_cluster(after).contains(&"t2".to_string()));
    }

    #[test]
    fn round_trip_remove_all_reaches_empty_state() {
        let mut ecm = EcmProcessor::new(0.5).unwrap();
        for (tag, e) in [("a", [1.0, 1.0]), ("b", [1.0, 2.0]), ("c", [5.0, 5.0])] {
            ecm.process(tag, &e);
        }
        for tag in ["a", "b", "c"] {
            ecm.remove(tag);
        }
        assert!(ecm.get_cluster_ids().is_empty());
    }
}
