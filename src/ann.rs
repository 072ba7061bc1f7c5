//! ID-keyed nearest-prototype index used by the GTurbo processor
//!
//! An approximate index would preserve GTurbo's top-2 recall just as well;
//! this crate ships a brute-force exact index instead, since GTurbo's graphs
//! stay small (nodes are created only on `Increase` and on out-of-radius
//! points) and an exact scan keeps the engine dependency-free and
//! reproducible.

use crate::vector::squared_euclidean;

/// Nearest-prototype index: add/remove/search by Euclidean distance.
pub trait AnnIndex {
    /// Insert or overwrite the vector associated with `id`.
    fn add(&mut self, id: u64, vector: Vec<f64>);

    /// Remove the vector associated with `id`, if present.
    fn remove(&mut self, id: u64);

    /// Return up to `k` ids nearest to `query`, in ascending distance order.
    fn search(&self, query: &[f64], k: usize) -> Vec<u64>;

    /// Number of vectors currently indexed.
    fn len(&self) -> usize;

    /// Whether the index holds no vectors.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exact brute-force nearest-neighbor index over an in-memory vector list.
#[derive(Debug, Default, Clone)]
pub struct BruteForceIndex {
    vectors: Vec<(u64, Vec<f64>)>,
}

impl BruteForceIndex {
    /// Create a new empty index.
    pub fn new() -> Self {
        Self {
            vectors: Vec::new(),
        }
    }
}

impl AnnIndex for BruteForceIndex {
    fn add(&mut self, id: u64, vector: Vec<f64>) {
        if let Some(entry) = self.vectors.iter_mut().find(|(existing, _)| *existing == id) {
            entry.1 = vector;
        } else {
            self.vectors.push((id, vector));
        }
    }

    fn remove(&mut self, id: u64) {
        self.vectors.retain(|(existing, _)| *existing != id);
    }

    fn search(&self, query: &[f64], k: usize) -> Vec<u64> {
        let mut scored: Vec<(f64, u64)> = self
            .vectors
            .iter()
            .map(|(id, v)| (squared_euclidean(query, v), *id))
            .collect();
        scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap().then(a.1.cmp(&b.1)));
        scored.into_iter().take(k).map(|(_, id)| id).collect()
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_returns_nearest_first() {
        let mut idx = BruteForceIndex::new();
        idx.add(0, vec![0.0, 0.0]);
        idx.add(1, vec![10.0, 10.0]);
        idx.add(2, vec![1.0, 1.0]);

        let result = idx.search(&[0.5, 0.5], 2);
        assert_eq!(result, vec![0, 2]);
    }

    #[test]
    fn remove_excludes_from_future_searches() {
        let mut idx = BruteForceIndex::new();
        idx.add(0, vec![0.0, 0.0]);
        idx.add(1, vec![1.0, 1.0]);
        idx.remove(0);

        assert_eq!(idx.len(), 1);
        assert_eq!(idx.search(&[0.0, 0.0], 1), vec![1]);
    }

    #[test]
    fn add_overwrites_existing_id() {
        let mut idx = BruteForceIndex::new();
        idx.add(0, vec![0.0, 0.0]);
        idx.add(0, vec![5.0, 5.0]);
        assert_eq!(idx.len(), 1);
        assert_eq!(idx.search(&[5.0, 5.0], 1), vec![0]);
    }
}
