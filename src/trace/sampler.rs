//! Trace sampling.
//!
//! A sampling decision is made once per trace, at root span creation, and
//! inherited by every descendant: children copy the decision from their
//! parent's [`SpanContext`] instead of re-sampling. Spans of dropped traces
//! still execute normally but record nothing and never reach the writer.

use crate::trace::TraceId;

/// Interface for sampling decisions at root span creation.
pub trait ShouldSample: Send + Sync + std::fmt::Debug {
    /// Decide whether the trace identified by `trace_id` should be kept.
    ///
    /// Implementations must be deterministic in `trace_id` so that every
    /// participant of a trace reaches the same decision.
    fn should_sample(&self, trace_id: TraceId, name: &str) -> bool;
}

/// Built-in sampling strategies.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum Sampler {
    /// Always sample the trace.
    AlwaysOn,
    /// Never sample the trace.
    AlwaysOff,
    /// Sample a given fraction of traces, decided deterministically from the
    /// trace id. Fractions >= 1 always sample; fractions <= 0 never sample.
    TraceIdRatioBased(f64),
}

impl ShouldSample for Sampler {
    fn should_sample(&self, trace_id: TraceId, _name: &str) -> bool {
        match self {
            Sampler::AlwaysOn => true,
            Sampler::AlwaysOff => false,
            Sampler::TraceIdRatioBased(prob) => sample_based_on_probability(*prob, trace_id),
        }
    }
}

pub(crate) fn sample_based_on_probability(prob: f64, trace_id: TraceId) -> bool {
    if prob >= 1.0 {
        return true;
    }
    let prob_upper_bound = (prob.max(0.0) * (1u64 << 63) as f64) as u64;
    // Derived from the low 64 bits of the trace id so that the decision is a
    // pure function of the id.
    let trace_id_low = trace_id.to_u128() as u64;
    let rnd_from_trace_id = trace_id_low >> 1;
    rnd_from_trace_id < prob_upper_bound
}
