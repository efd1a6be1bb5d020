//! Errors surfaced by the tracing core.
//!
//! Tracing is best-effort: failures in span capture or export degrade
//! observability and are reported through this type, but they must never
//! alter the behavior of instrumented application code. Producer misuse
//! (double finish, unbalanced context pops) is recovered locally and never
//! reaches this type at all.

use std::sync::PoisonError;
use std::time::Duration;
use thiserror::Error;

/// Result type used throughout the tracing core.
pub type TraceResult<T> = Result<T, TraceError>;

/// Failures in span export and writer lifecycle operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TraceError {
    /// The collector was unreachable, timed out, or rejected the batch.
    /// Retried per the writer's retry policy; exhaustion degrades to span
    /// loss, not host failure.
    #[error("span export failed: {0}")]
    Transport(String),

    /// An encoder failed to serialize a span batch.
    #[error("span batch encoding failed: {0}")]
    Encode(String),

    /// A flush or shutdown did not complete within its deadline.
    #[error("export timed out after {0:?}")]
    ExportTimedOut(Duration),

    /// The writer has already been shut down.
    #[error("writer already shut down")]
    AlreadyShutdown,

    /// Other failures not covered by the variants above.
    #[error("{0}")]
    Other(String),
}

impl<T> From<PoisonError<T>> for TraceError {
    fn from(err: PoisonError<T>) -> Self {
        TraceError::Other(err.to_string())
    }
}
