//! In-memory span exporter for tests and debugging.

use crate::error::{TraceError, TraceResult};
use crate::export::{ExportResult, SpanExporter};
use crate::trace::SpanData;
use futures_util::future::BoxFuture;
use std::sync::{Arc, Mutex};

/// A span exporter that stores finished spans in memory.
///
/// Useful for testing and debugging; spans are retrieved with
/// [`get_finished_spans`](InMemorySpanExporter::get_finished_spans). Clones
/// share the same storage.
#[derive(Clone, Debug, Default)]
pub struct InMemorySpanExporter {
    spans: Arc<Mutex<Vec<SpanData>>>,
}

impl InMemorySpanExporter {
    /// Returns the finished spans exported so far.
    pub fn get_finished_spans(&self) -> TraceResult<Vec<SpanData>> {
        self.spans
            .lock()
            .map(|spans| spans.clone())
            .map_err(TraceError::from)
    }

    /// Clears the internal storage of finished spans.
    pub fn reset(&self) {
        if let Ok(mut spans) = self.spans.lock() {
            spans.clear();
        }
    }
}

impl SpanExporter for InMemorySpanExporter {
    fn export(&mut self, batch: Vec<SpanData>) -> BoxFuture<'static, ExportResult> {
        let result = self
            .spans
            .lock()
            .map(|mut spans| spans.extend(batch))
            .map_err(|err| TraceError::Other(format!("failed to lock spans: {err}")));
        Box::pin(std::future::ready(result))
    }

    // Spans are retained across shutdown so tests can assert on the final
    // flush; call `reset` to clear them.
}
