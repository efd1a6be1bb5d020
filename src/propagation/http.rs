//! HTTP header propagation.

use crate::propagation::{Extractor, Injector};
use crate::trace::{SpanContext, SpanId, TraceId};

/// Carries the 128-bit trace id as lowercase hex.
pub const TRACE_ID_HEADER: &str = "x-tracecore-trace-id";
/// Carries the caller's span id as lowercase hex.
pub const PARENT_ID_HEADER: &str = "x-tracecore-parent-id";
/// `1` if the trace is sampled, `0` otherwise.
pub const SAMPLING_PRIORITY_HEADER: &str = "x-tracecore-sampling-priority";

/// Injects and extracts span contexts through HTTP-style header carriers.
#[derive(Clone, Debug, Default)]
pub struct HttpPropagator {
    _private: (),
}

impl HttpPropagator {
    pub fn new() -> Self {
        HttpPropagator::default()
    }

    /// Write `span_context` into the carrier. Invalid contexts are not
    /// injected at all, so the receiving side starts a fresh trace.
    pub fn inject(&self, span_context: &SpanContext, injector: &mut dyn Injector) {
        if !span_context.is_valid() {
            return;
        }
        injector.set(TRACE_ID_HEADER, span_context.trace_id().to_string());
        injector.set(PARENT_ID_HEADER, span_context.span_id().to_string());
        injector.set(
            SAMPLING_PRIORITY_HEADER,
            if span_context.is_sampled() { "1" } else { "0" }.to_string(),
        );
    }

    /// Read a span context out of the carrier. Missing or malformed
    /// headers yield `None` rather than an error; propagation fails open
    /// and the receiver simply starts a new trace.
    pub fn extract(&self, extractor: &dyn Extractor) -> Option<SpanContext> {
        let trace_id = TraceId::from_hex(extractor.get(TRACE_ID_HEADER)?).ok()?;
        let parent_id = SpanId::from_hex(extractor.get(PARENT_ID_HEADER)?).ok()?;

        let span_context = SpanContext::new(
            trace_id,
            parent_id,
            // Absent priority defaults to sampled, matching the sender
            // side never omitting it for a live trace.
            extractor.get(SAMPLING_PRIORITY_HEADER) != Some("0"),
        );
        span_context.is_valid().then_some(span_context)
    }
}
