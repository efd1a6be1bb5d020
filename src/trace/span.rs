//! # Span
//!
//! A `Span` is one timed, named unit of traced work. It is mutable while
//! open (tags, error state), becomes immutable at `finish`, and is handed
//! to the writer exactly once. Finishing is idempotent and also happens on
//! drop, so every exit path of instrumented code closes its span.

use crate::trace::{context, SpanContext, SpanId, TraceId, Writer};
use std::borrow::Cow;
use std::collections::HashMap;
use std::time::{Duration, SystemTime};

/// The immutable record of one finished operation.
///
/// Built up inside a [`Span`] while it is open; read-only once it has been
/// handed to the writer.
#[derive(Clone, Debug, PartialEq)]
pub struct SpanData {
    /// The trace this span belongs to.
    pub trace_id: TraceId,
    /// The span's own id.
    pub span_id: SpanId,
    /// The parent span's id, or `None` for a trace root.
    pub parent_id: Option<SpanId>,
    /// Operation label, e.g. `"get"`.
    pub name: Cow<'static, str>,
    /// Operation-specific detail, e.g. the command including its key.
    pub resource: Cow<'static, str>,
    /// The service the span is reported under.
    pub service: Cow<'static, str>,
    /// When the operation started.
    pub start_time: SystemTime,
    /// How long the operation took. Set exactly once, at finish.
    pub duration: Duration,
    /// Whether the operation failed.
    pub error: bool,
    /// Failure detail recorded via `set_error`, if any.
    pub error_message: Option<String>,
    /// Free-form string tags.
    pub tags: HashMap<String, String>,
}

/// A single operation within a trace.
///
/// Spans of unsampled traces are non-recording: mutators are no-ops and
/// `finish` only unwinds the context stack.
#[derive(Debug)]
pub struct Span {
    span_context: SpanContext,
    data: Option<SpanData>,
    finished: bool,
    writer: Writer,
}

impl Span {
    pub(crate) fn new(span_context: SpanContext, data: Option<SpanData>, writer: Writer) -> Self {
        Span {
            span_context,
            data,
            finished: false,
            writer,
        }
    }

    /// The immutable identity of this span.
    pub fn span_context(&self) -> &SpanContext {
        &self.span_context
    }

    /// True while the span is open and its trace is sampled.
    pub fn is_recording(&self) -> bool {
        !self.finished && self.data.is_some()
    }

    /// True once the span has been finished.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Set a string tag. Ignored after finish and on non-recording spans.
    pub fn set_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        if self.finished {
            return;
        }
        if let Some(data) = &mut self.data {
            data.tags.insert(key.into(), value.into());
        }
    }

    /// Mark the span as failed, recording the error's message.
    ///
    /// This never raises and never consumes the error; the caller is
    /// expected to keep propagating the original failure unchanged.
    pub fn set_error<E>(&mut self, err: &E)
    where
        E: std::fmt::Display + ?Sized,
    {
        if self.finished {
            return;
        }
        if let Some(data) = &mut self.data {
            data.error = true;
            data.error_message = Some(err.to_string());
        }
    }

    /// Close the span: compute its duration, unwind the context stack, and
    /// hand the record to the writer.
    ///
    /// Idempotent; a second call is a no-op.
    pub fn finish(&mut self) {
        if self.finished {
            tracing::debug!(
                name: "Span.DoubleFinish",
                span_id = self.span_context.span_id().to_string(),
            );
            return;
        }
        self.finished = true;
        context::pop(&self.span_context);
        if let Some(mut data) = self.data.take() {
            data.duration = data.start_time.elapsed().unwrap_or_default();
            self.writer.enqueue(data);
        }
    }
}

impl Drop for Span {
    /// Close the span if instrumented code failed to.
    fn drop(&mut self) {
        if !self.finished {
            self.finish();
        }
    }
}
