//! Trace and span identifiers.
//!
//! A `TraceId` is a 128-bit identifier shared by every span of a trace; a
//! `SpanId` is a 64-bit identifier unique to one span. Both render as
//! lowercase hex for propagation headers and wire encodings. The all-zero
//! value is invalid and never generated.

use std::fmt;
use std::num::ParseIntError;
use thiserror::Error;

/// Error returned when parsing an identifier from its hex form.
#[derive(Error, Debug)]
#[error("invalid id: {0}")]
pub struct IdParseError(#[from] ParseIntError);

/// A 128-bit identifier shared by all spans of one trace.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TraceId(u128);

impl TraceId {
    /// The invalid trace id (all zeroes).
    pub const INVALID: TraceId = TraceId(0);

    /// Construct from its representation as a `u128`.
    pub const fn from_u128(value: u128) -> Self {
        TraceId(value)
    }

    /// The id as a `u128`.
    pub const fn to_u128(self) -> u128 {
        self.0
    }

    /// Parse from a lowercase hex string of up to 32 characters.
    pub fn from_hex(hex: &str) -> Result<Self, IdParseError> {
        u128::from_str_radix(hex, 16).map(TraceId).map_err(Into::into)
    }
}

impl fmt::Debug for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TraceId({:032x})", self.0)
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

impl From<u128> for TraceId {
    fn from(value: u128) -> Self {
        TraceId(value)
    }
}

/// A 64-bit identifier for a single span.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpanId(u64);

impl SpanId {
    /// The invalid span id (all zeroes).
    pub const INVALID: SpanId = SpanId(0);

    /// Construct from its representation as a `u64`.
    pub const fn from_u64(value: u64) -> Self {
        SpanId(value)
    }

    /// The id as a `u64`.
    pub const fn to_u64(self) -> u64 {
        self.0
    }

    /// Parse from a lowercase hex string of up to 16 characters.
    pub fn from_hex(hex: &str) -> Result<Self, IdParseError> {
        u64::from_str_radix(hex, 16).map(SpanId).map_err(Into::into)
    }
}

impl fmt::Debug for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SpanId({:016x})", self.0)
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl From<u64> for SpanId {
    fn from(value: u64) -> Self {
        SpanId(value)
    }
}

/// Immutable identity of one span: its trace, its own id, and the sampling
/// decision made for the trace. Cheap to clone, safe to share across
/// threads, and the only part of a span that outlives `finish`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SpanContext {
    trace_id: TraceId,
    span_id: SpanId,
    sampled: bool,
}

impl SpanContext {
    /// Create a span context.
    pub fn new(trace_id: TraceId, span_id: SpanId, sampled: bool) -> Self {
        SpanContext {
            trace_id,
            span_id,
            sampled,
        }
    }

    /// The trace this span belongs to.
    pub fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    /// The span's own id.
    pub fn span_id(&self) -> SpanId {
        self.span_id
    }

    /// Whether the trace was selected for export.
    pub fn is_sampled(&self) -> bool {
        self.sampled
    }

    /// True when both ids are non-zero.
    pub fn is_valid(&self) -> bool {
        self.trace_id != TraceId::INVALID && self.span_id != SpanId::INVALID
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_id_hex_round_trip() {
        let id = TraceId::from_u128(0x4bf9_2f35_77b3_4da6_a3ce_929d_0e0e_4736);
        assert_eq!(id.to_string(), "4bf92f3577b34da6a3ce929d0e0e4736");
        assert_eq!(TraceId::from_hex(&id.to_string()).unwrap(), id);
    }

    #[test]
    fn span_id_hex_round_trip() {
        let id = SpanId::from_u64(0x00f0_67aa_0ba9_02b7);
        assert_eq!(id.to_string(), "00f067aa0ba902b7");
        assert_eq!(SpanId::from_hex(&id.to_string()).unwrap(), id);
    }

    #[test]
    fn short_hex_is_accepted() {
        assert_eq!(TraceId::from_hex("7b").unwrap(), TraceId::from_u128(123));
        assert_eq!(SpanId::from_hex("7b").unwrap(), SpanId::from_u64(123));
    }

    #[test]
    fn malformed_hex_is_rejected()  {
        assert!(TraceId::from_hex("not-hex").is_err());
        assert!(SpanId::from_hex("").is_err());
        assert!(SpanId::from_hex("fffffffffffffffff").is_err()); // 17 digits
    }

    #[test]
    fn validity_requires_both_ids() {
        let valid = SpanContext::new(TraceId::from_u128(1), SpanId::from_u64(1), true);
        assert!(valid.is_valid());
        let no_trace = SpanContext::new(TraceId::INVALID, SpanId::from_u64(1), true);
        assert!(!no_trace.is_valid());
        let no_span = SpanContext::new(TraceId::from_u128(1), SpanId::INVALID, true);
        assert!(!no_span.is_valid());
    }
}
