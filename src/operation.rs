//! Tagged-union operation dispatcher
//!
//! Mirrors `on_operation` from the source this crate was distilled from: one
//! enum per caller-issued command, routed to the matching [`Engine`] call by
//! an exhaustive `match`.

use serde::{Deserialize, Serialize};

use crate::error::EngineResult;
use crate::evaluation::{ClusterReport, MatchReport};
use crate::facade::Engine;
use crate::scoring::Scoring;
use crate::transformer::Instance;

/// One caller-issued command against an [`Engine`].
#[derive(Debug, Clone)]
pub enum Operation<V> {
    Add {
        tag: String,
        transformer_key: String,
        value: V,
    },
    Update {
        tag: String,
        transformer_key: String,
        value: V,
    },
    Remove {
        tag: String,
    },
    CalculateScores {
        transformer_key: String,
        value: V,
    },
    CalculateMatches {
        transformer_key: String,
        value: V,
    },
    EvaluateClusters,
    EvaluateMatches {
        queries: Vec<Instance<V>>,
        fetch_instance: bool,
    },
}

/// The result of dispatching one [`Operation`]. Each variant lines up with
/// the operation that produced it; `None`-returning operations (unknown
/// transformer key, unknown tag) surface as [`OperationOutcome::Empty`].
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum OperationOutcome<V>
where
    V: Serialize,
{
    Applied(bool),
    Scorings(Vec<Scoring>),
    Clusters(ClusterReport),
    Matches(MatchReport<V>),
    Empty,
}

/// Route `operation` to the matching [`Engine`] call. A dimension mismatch
/// on `Add`/`Update` surfaces as `Err`, before any state is mutated.
pub fn dispatch<V: Clone + Serialize>(
    engine: &mut Engine<V>,
    operation: Operation<V>,
) -> EngineResult<OperationOutcome<V>> {
    Ok(match operation {
        Operation::Add {
            tag,
            transformer_key,
            value,
        } => OperationOutcome::Applied(engine.add(tag, &transformer_key, value)?),

        Operation::Update {
            tag,
            transformer_key,
            value,
        } => OperationOutcome::Applied(engine.update(&tag, &transformer_key, value)?),

        Operation::Remove { tag } => OperationOutcome::Applied(engine.remove(&tag)),

        Operation::CalculateScores { transformer_key, value } => {
            match engine.get_scorings_for(&transformer_key, value) {
                Some(scorings) => OperationOutcome::Scorings(scorings),
                None => OperationOutcome::Empty,
            }
        }

        Operation::CalculateMatches { transformer_key, value } => {
            match engine.get_matches_for(&transformer_key, value) {
                Some(scorings) => OperationOutcome::Scorings(scorings),
                None => OperationOutcome::Empty,
            }
        }

        Operation::EvaluateClusters => OperationOutcome::Clusters(engine.evaluate_clusters()),

        Operation::EvaluateMatches {
            queries,
            fetch_instance,
        } => OperationOutcome::Matches(engine.evaluate_matches(&queries, fetch_instance)),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Add,
    Update,
    Remove,
    CalculateScores,
    CalculateMatches,
    EvaluateClusters,
    EvaluateMatches,
}

impl<V> Operation<V> {
    /// The operation's kind, independent of its payload — used for logging
    /// and for building `OperationType`-style reports without cloning `V`.
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Add { .. } => OperationKind::Add,
            Operation::Update { .. } => OperationKind::Update,
            Operation::Remove { .. } => OperationKind::Remove,
            Operation::CalculateScores { .. } => OperationKind::CalculateScores,
            Operation::CalculateMatches { .. } => OperationKind::CalculateMatches,
            Operation::EvaluateClusters => OperationKind::EvaluateClusters,
            Operation::EvaluateMatches { .. } => OperationKind::EvaluateMatches,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::{EcmProcessor, ProcessorKind};
    use crate::transformer::IdentityTransformer;

    fn new_engine() -> Engine<Vec<f64>> {
        let processor = ProcessorKind::Ecm(EcmProcessor::new(0.5).unwrap());
        let mut engine = Engine::new(processor);
        engine.register_transformer("identity", Box::new(IdentityTransformer));
        engine
    }

    #[test]
    fn add_dispatches_to_engine_add() {
        let mut engine = new_engine();
        let outcome = dispatch(
            &mut engine,
            Operation::Add {
                tag: "t1".to_string(),
                transformer_key: "identity".to_string(),
                value: vec![1.0, 1.0],
            },
        )
        .unwrap();
        assert!(matches!(outcome, OperationOutcome::Applied(true)));
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn unknown_transformer_key_yields_empty_outcome_for_scoring_ops() {
        let mut engine = new_engine();
        let outcome = dispatch(
            &mut engine,
            Operation::CalculateScores {
                transformer_key: "nope".to_string(),
                value: vec![1.0, 1.0],
            },
        )
        .unwrap();
        assert!(matches!(outcome, OperationOutcome::Empty));
    }

    #[test]
    fn operation_kind_matches_variant() {
        let op: Operation<Vec<f64>> = Operation::Remove {
            tag: "t1".to_string(),
        };
        assert_eq!(op.kind(), OperationKind::Remove);
    }
}
