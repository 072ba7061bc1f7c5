//! Value-to-embedding transformers
//!
//! The engine itself only ever consumes `Vec<f64>` embeddings; a
//! `Transformer` is the caller-supplied boundary that turns an arbitrary
//! payload `V` into an [`Instance<V>`] before it reaches the engine.

use serde::{Deserialize, Serialize};

/// A stored `(value, embedding)` pair. The facade keeps the original value
/// around so callers can retrieve it later; only `embedding` is ever
/// forwarded to a processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance<V> {
    pub value: V,
    pub embedding: Vec<f64>,
}

impl<V> Instance<V> {
    pub fn new(value: V, embedding: Vec<f64>) -> Self {
        Self { value, embedding }
    }
}

/// Turns a caller's value type into an embedded [`Instance`].
pub trait Transformer<V> {
    fn transform(&self, value: V) -> Instance<V>;
}

/// A transformer for payloads that already *are* embeddings: `transform`
/// clones the vector into both `value` and `embedding`.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityTransformer;

impl Transformer<Vec<f64>> for IdentityTransformer {
    fn transform(&self, value: Vec<f64>) -> Instance<Vec<f64>> {
        Instance {
            embedding: value.clone(),
            value,
        }
    }
}

/// A transformer for payloads that arrive as a pre-built `Instance<V>`:
/// `transform` is a pass-through that re-wraps the same pair.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThroughTransformer;

impl<V> Transformer<Instance<V>> for PassThroughTransformer {
    fn transform(&self, value: Instance<V>) -> Instance<Instance<V>> {
        let embedding = value.embedding.clone();
        Instance {
            value,
            embedding,
        }
    }
}
