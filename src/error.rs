//! Crate-wide error types

use thiserror::Error;

/// Errors that can occur constructing or operating the engine.
///
/// Unknown tags on `update`/`remove` are not represented here — those are
/// surfaced as a `bool` return (see [`crate::facade::Engine`]) rather than
/// an error, since a missing tag is a normal, recoverable outcome for a
/// caller to branch on locally.
#[derive(Debug, Error)]
pub enum EngineError {
    /// An embedding was added whose dimensionality does not match the
    /// engine's fixed dimension.
    #[error("invalid embedding dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    /// A construction parameter violated a processor's invariants.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// An output format requested by a caller is not supported.
    ///
    /// Not raised anywhere in this crate today — report encoding is a
    /// caller-side concern — but kept as part of the public error surface
    /// for callers that route format selection through this type.
    #[error("unsupported output format: {0}")]
    UnsupportedFormat(String),
}

/// Convenience result alias for fallible engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
