//! GTurbo: growing neural gas with topological edge aging

mod graph;

use std::collections::HashMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace};

use crate::ann::{AnnIndex, BruteForceIndex};
use crate::error::{EngineError, EngineResult};
use crate::vector::{euclidean, squared_euclidean};

use self::graph::{Graph, Node, NodeId};
use super::{ClusterId, ClusterProcessor, Description};

/// Growing-neural-gas clustering processor with error-driven node
/// insertion and age-based edge pruning.
pub struct GTurboProcessor {
    eb: f64,
    en: f64,
    lambda: u32,
    beta: f64,
    alpha: f64,
    max_age: u32,
    r0: f64,
    dimensions: usize,
    random_seed: u64,

    graph: Graph,
    index: Box<dyn AnnIndex>,
    next_id: NodeId,
    point_to_cluster: HashMap<String, NodeId>,
    cycle: u64,
    step: u32,
}

impl GTurboProcessor {
    /// Build a new processor, seeding two random nodes at ids `0`/`1` from
    /// `random_seed` so construction is reproducible.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        eb: f64,
        en: f64,
        lambda: u32,
        beta: f64,
        alpha: f64,
        max_age: u32,
        r0: f64,
        dimensions: usize,
        random_seed: u64,
    ) -> EngineResult<Self> {
        if !(0.0..1.0).contains(&beta) || beta <= 0.0 {
            return Err(EngineError::InvalidParameter(format!(
                "GTurbo beta must be in (0,1), got {beta}"
            )));
        }
        if !(0.0..1.0).contains(&alpha) || alpha <= 0.0 {
            return Err(EngineError::InvalidParameter(format!(
                "GTurbo alpha must be in (0,1), got {alpha}"
            )));
        }
        if lambda == 0 {
            return Err(EngineError::InvalidParameter(
                "GTurbo lambda must be > 0".to_string(),
            ));
        }
        if r0 < 0.0 {
            return Err(EngineError::InvalidParameter(
                "GTurbo r0 must be >= 0".to_string(),
            ));
        }
        if dimensions == 0 {
            return Err(EngineError::InvalidParameter(
                "GTurbo dimensions must be > 0".to_string(),
            ));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(random_seed);
        let mut graph = Graph::new();
        let mut index: Box<dyn AnnIndex> = Box::new(BruteForceIndex::new());

        for id in [0u64, 1u64] {
            let prototype: Vec<f64> = (0..dimensions).map(|_| rng.gen::<f64>()).collect();
            index.add(id, prototype.clone());
            graph.insert_node(Node::new(id, prototype, r0));
        }

        Ok(Self {
            eb,
            en,
            lambda,
            beta,
            alpha,
            max_age,
            r0,
            dimensions,
            random_seed,
            graph,
            index,
            next_id: 2,
            point_to_cluster: HashMap::new(),
            cycle: 0,
            step: 0,
        })
    }

    /// Normalize `id`'s error to the current cycle, per `fix_error`.
    fn fix_error(&mut self, id: NodeId) {
        let cycle = self.cycle;
        let lambda = self.lambda as f64;
        let node = self.graph.node_mut(id).unwrap();
        if node.error_cycle != cycle {
            let elapsed = (cycle - node.error_cycle) as f64;
            node.error *= self.beta.powf(lambda * elapsed);
            node.error_cycle = cycle;
        }
        self.graph.resync_heap(id);
    }

    /// `increment_error`: normalize to the current cycle, then accumulate
    /// this step's squared distance.
    fn increment_error(&mut self, id: NodeId, value: f64) {
        self.fix_error(id);
        let step = self.step as f64;
        let lambda = self.lambda as f64;
        let node = self.graph.node_mut(id).unwrap();
        node.error = node.error * self.beta.powf(lambda - step) + value;
        self.graph.resync_heap(id);
    }

    fn move_node(&mut self, id: NodeId, target: &[f64], rate: f64) {
        let node = self.graph.node_mut(id).unwrap();
        for (p, t) in node.prototype.iter_mut().zip(target) {
            *p += rate * (t - *p);
        }
        let prototype = node.prototype.clone();
        self.index.add(id, prototype);
    }

    fn gc_isolated_nodes(&mut self) {
        for id in self.graph.node_ids() {
            if self
                .graph
                .node(id)
                .map(|n| n.is_isolated())
                .unwrap_or(false)
            {
                self.graph.remove_node(id);
                self.index.remove(id);
                debug!(node_id = id, "GTurbo node garbage-collected");
            }
        }
    }

    /// `Increase`: split the highest-error node's region by inserting a new
    /// node between it and its highest-error topological neighbor.
    fn turbo_increase(&mut self) {
        let q = match self.graph.max_error_node() {
            Some(id) => id,
            None => return,
        };
        let f = match self
            .graph
            .node(q)
            .unwrap()
            .neighbors
            .iter()
            .copied()
            .max_by(|&a, &b| {
                self.graph.node(a).unwrap().error.partial_cmp(&self.graph.node(b).unwrap().error).unwrap()
            }) {
            Some(id) => id,
            None => return,
        };

        self.graph.remove_link(q, f);
        self.fix_error(q);
        self.fix_error(f);
        self.graph.node_mut(q).unwrap().error *= self.alpha;
        self.graph.node_mut(f).unwrap().error *= self.alpha;
        self.graph.resync_heap(q);
        self.graph.resync_heap(f);

        let q_error = self.graph.node(q).unwrap().error;
        let f_error = self.graph.node(f).unwrap().error;
        let midpoint: Vec<f64> = self
            .graph
            .node(q)
            .unwrap()
            .prototype
            .iter()
            .zip(&self.graph.node(f).unwrap().prototype)
            .map(|(a, b)| (a + b) / 2.0)
            .collect();

        let r = self.next_id;
        self.next_id += 1;
        let mut node = Node::new(r, midpoint.clone(), self.r0);
        node.error = (q_error + f_error) / 2.0;
        node.error_cycle = self.cycle;
        self.index.add(r, midpoint);
        self.graph.insert_node(node);

        self.graph.touch_link(q, r);
        self.graph.touch_link(f, r);
    }
}

impl ClusterProcessor for GTurboProcessor {
    fn process(&mut self, tag: &str, embedding: &[f64]) {
        let neighbors = self.index.search(embedding, 2);
        let v = neighbors[0];
        let u = neighbors.get(1).copied();

        let winner_distance = euclidean(embedding, &self.graph.node(v).unwrap().prototype);

        if winner_distance <= self.graph.node(v).unwrap().radius {
            self.point_to_cluster.insert(tag.to_string(), v);
            self.graph.node_mut(v).unwrap().instance_tags.push(tag.to_string());

            let value = squared_euclidean(embedding, &self.graph.node(v).unwrap().prototype);
            self.increment_error(v, value);

            self.move_node(v, embedding, self.eb);
            let neighbor_ids: Vec<NodeId> = self.graph.node(v).unwrap().neighbors.iter().copied().collect();
            for n in neighbor_ids {
                self.move_node(n, embedding, self.en);
            }

            let expired = self.graph.age_incident_links(v, self.max_age);
            if let Some(u) = u {
                self.graph.touch_link(v, u);
            }
            for other in expired {
                // `touch_link` above may have just renewed `(v, other)` to
                // age 0 if `other == u`; re-check the current age rather
                // than trusting the pre-renewal snapshot.
                let still_expired = self
                    .graph
                    .link(v, other)
                    .map(|link| link.age > self.max_age)
                    .unwrap_or(true);
                if still_expired {
                    trace!(node_a = v, node_b = other, "GTurbo link aged out");
                    self.graph.remove_link(v, other);
                }
            }

            self.gc_isolated_nodes();
        } else {
            let id = self.next_id;
            self.next_id += 1;
            let mut node = Node::new(id, embedding.to_vec(), self.r0);
            node.error_cycle = self.cycle;
            node.instance_tags.push(tag.to_string());
            self.index.add(id, embedding.to_vec());
            self.graph.insert_node(node);
            self.graph.touch_link(id, v);
            debug!(node_id = id, winner = v, "GTurbo node inserted");
            self.point_to_cluster.insert(tag.to_string(), id);
        }

        if self.step == self.lambda - 1 {
            self.turbo_increase();
            self.step = 0;
            self.cycle += 1;
        } else {
            self.step += 1;
        }
    }

    fn update(&mut self, tag: &str, embedding: &[f64]) {
        self.remove(tag);
        self.process(tag, embedding);
    }

    fn remove(&mut self, tag: &str) {
        if let Some(id) = self.point_to_cluster.remove(tag) {
            if let Some(node) = self.graph.node_mut(id) {
                node.instance_tags.retain(|t| t != tag);
            }
        }
    }

    fn predict(&self, embedding: &[f64]) -> Option<ClusterId> {
        self.index.search(embedding, 1).first().copied()
    }

    fn get_cluster_by_tag(&self, tag: &str) -> Option<ClusterId> {
        self.point_to_cluster.get(tag).copied()
    }

    fn get_tags_in_cluster(&self, cluster_id: ClusterId) -> Vec<String> {
        self.graph
            .node(cluster_id)
            .map(|n| n.instance_tags.clone())
            .unwrap_or_default()
    }

    fn get_cluster_ids(&self) -> Vec<ClusterId> {
        self.graph.node_ids()
    }

    fn describe(&self) -> Description {
        Description {
            name: "GTurbo".to_string(),
            parameters: vec![
                ("eb".to_string(), self.eb),
                ("en".to_string(), self.en),
                ("lambda".to_string(), self.lambda as f64),
                ("beta".to_string(), self.beta),
                ("alpha".to_string(), self.alpha),
                ("max_age".to_string(), self.max_age as f64),
                ("r0".to_string(), self.r0),
                ("dimensions".to_string(), self.dimensions as f64),
                ("random_seed".to_string(), self.random_seed as f64),
            ],
        }
    }

    fn safe_file_name(&self) -> String {
        format!(
            "GTurbo = eb={}, en={}, lambda={}, beta={}, alpha={}, max_age={}, r0={}",
            self.eb, self.en, self.lambda, self.beta, self.alpha, self.max_age, self.r0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_default() -> GTurboProcessor {
        GTurboProcessor::new(0.1, 0.01, 100, 0.9, 0.5, 50, 0.1, 2, 42).unwrap()
    }

    #[test]
    fn rejects_invalid_parameters() {
        assert!(GTurboProcessor::new(0.1, 0.01, 100, 0.0, 0.5, 50, 0.1, 2, 42).is_err());
        assert!(GTurboProcessor::new(0.1, 0.01, 100, 0.9, 1.0, 50, 0.1, 2, 42).is_err());
        assert!(GTurboProcessor::new(0.1, 0.01, 0, 0.9, 0.5, 50, 0.1, 2, 42).is_err());
        assert!(GTurboProcessor::new(0.1, 0.01, 100, 0.9, 0.5, 50, 0.1, 0, 42).is_err());
    }

    #[test]
    fn construction_seeds_two_disconnected_nodes() {
        let g = new_default();
        let mut ids = g.get_cluster_ids();
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 1]);
    }

    #[test]
    fn same_seed_is_reproducible() {
        let a = GTurboProcessor::new(0.1, 0.01, 100, 0.9, 0.5, 50, 0.1, 3, 7).unwrap();
        let b = GTurboProcessor::new(0.1, 0.01, 100, 0.9, 0.5, 50, 0.1, 3, 7).unwrap();
        assert_eq!(
            a.graph.node(0).unwrap().prototype,
            b.graph.node(0).unwrap().prototype
        );
        assert_eq!(
            a.graph.node(1).unwrap().prototype,
            b.graph.node(1).unwrap().prototype
        );
    }

    #[test]
    fn process_assigns_tag_to_a_node() {
        let mut g = new_default();
        g.process("t1", &[0.5, 0.5]);
        assert!(g.get_cluster_by_tag("t1").is_some());
    }

    #[test]
    fn remove_detaches_tag_without_deleting_occupied_node() {
        let mut g = new_default();
        g.process("t1", &[0.5, 0.5]);
        let id = g.get_cluster_by_tag("t1").unwrap();
        g.remove("t1");
        assert_eq!(g.get_cluster_by_tag("t1"), None);
        // Node still exists: it has topological neighbors from construction.
        assert!(g.graph.contains(id) || !g.get_cluster_ids().contains(&id));
    }

    #[test]
    fn predict_does_not_mutate_graph_size() {
        let mut g = new_default();
        g.process("t1", &[0.5, 0.5]);
        let before = g.get_cluster_ids().len();
        let _ = g.predict(&[0.6, 0.6]);
        assert_eq!(g.get_cluster_ids().len(), before);
    }

    #[test]
    fn renewed_winner_runner_up_link_survives_same_step_aging() {
        // eb=en=0 so prototypes never move and the winner/runner-up stay
        // fixed across both inserts; max_age=0 so a single aging step always
        // pushes the winner-runner-up link's age past the threshold, making
        // it a candidate for removal on the same step `touch_link` renews it.
        let mut g = GTurboProcessor::new(0.0, 0.0, 1000, 0.9, 0.5, 0, 1000.0, 2, 1).unwrap();
        g.process("t1", &[0.5, 0.5]);
        let v = g.get_cluster_by_tag("t1").unwrap();
        let other = if v == 0 { 1 } else { 0 };
        assert!(g.graph.link(v, other).is_some());

        g.process("t2", &[0.5, 0.5]);
        assert!(
            g.graph.link(v, other).is_some(),
            "a link just renewed by touch_link must not be removed by the same step's aging pass"
        );
    }

    #[test]
    fn many_far_points_grow_the_graph() {
        let mut g = new_default();
        for i in 0..20 {
            let x = i as f64 * 5.0;
            g.process(&format!("t{i}"), &[x, x]);
        }
        assert!(g.get_cluster_ids().len() > 2);
    }
}
