//! The three incremental clustering processors and their common contract
//!
//! Each processor (ECM, GTurbo, Covariance) maintains its own notion of a
//! cluster and its own auxiliary lookup structure, but all three expose the
//! same operation surface. Rather than a trait-object hierarchy, the facade
//! holds a [`ProcessorKind`] tagged union so dispatch stays an exhaustive
//! `match` with no vtable indirection.

pub mod covariance;
pub mod ecm;
pub mod gturbo;

pub use covariance::CovarianceProcessor;
pub use ecm::EcmProcessor;
pub use gturbo::GTurboProcessor;

use serde::Serialize;

/// Stable, never-reused cluster identifier within one processor instance.
pub type ClusterId = u64;

/// Static description of a processor's algorithm and parameters, used for
/// reporting and for `safe_file_name()`.
#[derive(Debug, Clone, Serialize)]
pub struct Description {
    pub name: String,
    pub parameters: Vec<(String, f64)>,
}

/// Operations common to every incremental clustering processor.
pub trait ClusterProcessor {
    /// Insert a new tagged embedding. Undefined if `tag` is already present.
    fn process(&mut self, tag: &str, embedding: &[f64]);

    /// Re-embed an existing tag. Undefined if `tag` is absent.
    fn update(&mut self, tag: &str, embedding: &[f64]);

    /// Detach `tag`. Deletes the owning cluster if it becomes empty
    /// (ECM) or marks the owning node eligible for reclamation (GTurbo).
    fn remove(&mut self, tag: &str);

    /// Identify the cluster a hypothetical embedding would join, without
    /// mutating state.
    fn predict(&self, embedding: &[f64]) -> Option<ClusterId>;

    /// The cluster currently owning `tag`, if any.
    fn get_cluster_by_tag(&self, tag: &str) -> Option<ClusterId>;

    /// All tags currently attached to `cluster_id`, in a stable order.
    fn get_tags_in_cluster(&self, cluster_id: ClusterId) -> Vec<String>;

    /// All live cluster ids.
    fn get_cluster_ids(&self) -> Vec<ClusterId>;

    /// Human-readable algorithm name and parameters.
    fn describe(&self) -> Description;

    /// Stable, filesystem-safe identifier derived from parameters.
    fn safe_file_name(&self) -> String;
}

/// Tagged union over the three processor implementations.
///
/// Holding the concrete processor behind an enum (rather than
/// `Box<dyn ClusterProcessor>`) keeps the facade's dispatch exhaustive and
/// avoids a vtable indirection on every streaming insert.
pub enum ProcessorKind {
    Ecm(EcmProcessor),
    GTurbo(Box<GTurboProcessor>),
    Covariance(CovarianceProcessor),
}

impl ClusterProcessor for ProcessorKind {
    fn process(&mut self, tag: &str, embedding: &[f64]) {
        match self {
            ProcessorKind::Ecm(p) => p.process(tag, embedding),
            ProcessorKind::GTurbo(p) => p.process(tag, embedding),
            ProcessorKind::Covariance(p) => p.process(tag, embedding),
        }
    }

    fn update(&mut self, tag: &str, embedding: &[f64]) {
        match self {
            ProcessorKind::Ecm(p) => p.update(tag, embedding),
            ProcessorKind::GTurbo(p) => p.update(tag, embedding),
            ProcessorKind::Covariance(p) => p.update(tag, embedding),
        }
    }

    fn remove(&mut self, tag: &str) {
        match self {
            ProcessorKind::Ecm(p) => p.remove(tag),
            ProcessorKind::GTurbo(p) => p.remove(tag),
            ProcessorKind::Covariance(p) => p.remove(tag),
        }
    }

    fn predict(&self, embedding: &[f64]) -> Option<ClusterId> {
        match self {
            ProcessorKind::Ecm(p) => p.predict(embedding),
            ProcessorKind::GTurbo(p) => p.predict(embedding),
            ProcessorKind::Covariance(p) => p.predict(embedding),
        }
    }

    fn get_cluster_by_tag(&self, tag: &str) -> Option<ClusterId> {
        match self {
            ProcessorKind::Ecm(p) => p.get_cluster_by_tag(tag),
            ProcessorKind::GTurbo(p) => p.get_cluster_by_tag(tag),
            ProcessorKind::Covariance(p) => p.get_cluster_by_tag(tag),
        }
    }

    fn get_tags_in_cluster(&self, cluster_id: ClusterId) -> Vec<String> {
        match self {
            ProcessorKind::Ecm(p) => p.get_tags_in_cluster(cluster_id),
            ProcessorKind::GTurbo(p) => p.get_tags_in_cluster(cluster_id),
            ProcessorKind::Covariance(p) => p.get_tags_in_cluster(cluster_id),
        }
    }

    fn get_cluster_ids(&self) -> Vec<ClusterId> {
        match self {
            ProcessorKind::Ecm(p) => p.get_cluster_ids(),
            ProcessorKind::GTurbo(p) => p.get_cluster_ids(),
            ProcessorKind::Covariance(p) => p.get_cluster_ids(),
        }
    }

    fn describe(&self) -> Description {
        match self {
            ProcessorKind::Ecm(p) => p.describe(),
            ProcessorKind::GTurbo(p) => p.describe(),
            ProcessorKind::Covariance(p) => p.describe(),
        }
    }

    fn safe_file_name(&self) -> String {
        match self {
            ProcessorKind::Ecm(p) => p.safe_file_name(),
            ProcessorKind::GTurbo(p) => p.safe_file_name(),
            ProcessorKind::Covariance(p) => p.safe_file_name(),
        }
    }
}
