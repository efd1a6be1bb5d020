//! Span exporter contract.

use crate::error::TraceError;
use crate::trace::SpanData;
use futures_util::future::BoxFuture;
use std::fmt::Debug;

/// Describes the result of an export.
pub type ExportResult = Result<(), TraceError>;

/// Interface that collector-specific exporters implement so the writer can
/// deliver finished spans to them.
///
/// An exporter is primarily an encoder and transmitter: it receives a batch
/// of read-only span records and delivers them to a destination. `export`
/// is never called concurrently for one exporter instance, and retries are
/// the writer's responsibility, not the exporter's.
pub trait SpanExporter: Send + Sync + Debug {
    /// Deliver a batch of finished spans to the destination.
    fn export(&mut self, batch: Vec<SpanData>) -> BoxFuture<'static, ExportResult>;

    /// Called once when the owning writer shuts down. Subsequent `export`
    /// calls are not made after this.
    fn shutdown(&mut self) {}
}

impl SpanExporter for Box<dyn SpanExporter> {
    fn export(&mut self, batch: Vec<SpanData>) -> BoxFuture<'static, ExportResult> {
        (**self).export(batch)
    }

    fn shutdown(&mut self) {
        (**self).shutdown()
    }
}
