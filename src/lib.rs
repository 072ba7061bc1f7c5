//! Vortex: online vector-clustering engine
//!
//! Three incremental clustering processors (ECM hyper-sphere clusters,
//! GTurbo growing neural gas, and covariance/Mahalanobis clusters) behind
//! one orchestrating [`Engine`] facade. Each processor consumes a stream of
//! `(tag, embedding)` pairs and maintains its own notion of a cluster; the
//! facade owns the tag→instance map and routes every mutation to exactly
//! one processor.
//!
//! # Example
//!
//! ```
//! use vortex_cluster::{Engine, EcmProcessor, ProcessorKind, IdentityTransformer};
//!
//! let processor = ProcessorKind::Ecm(EcmProcessor::new(0.5).unwrap());
//! let mut engine: Engine<Vec<f64>> = Engine::new(processor);
//! engine.register_transformer("identity", Box::new(IdentityTransformer));
//! engine.add("first", "identity", vec![1.0, 1.0]).unwrap();
//! ```

pub mod ann;
pub mod error;
pub mod evaluation;
pub mod facade;
pub mod operation;
pub mod processors;
pub mod scoring;
pub mod stats;
pub mod transformer;
pub mod vector;

pub use ann::{AnnIndex, BruteForceIndex};
pub use error::{EngineError, EngineResult};
pub use evaluation::{ClusterReport, MatchReport, QueryMatchDetail};
pub use facade::{Engine, EngineDescription, TransformerRegistry};
pub use operation::{dispatch, Operation, OperationKind, OperationOutcome};
pub use processors::{
    ClusterId, ClusterProcessor, CovarianceProcessor, Description, EcmProcessor, GTurboProcessor,
    ProcessorKind,
};
pub use scoring::{Scoring, ScoringCalculator};
pub use transformer::{IdentityTransformer, Instance, PassThroughTransformer, Transformer};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
