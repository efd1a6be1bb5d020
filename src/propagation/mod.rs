//! Trace context propagation across process boundaries.
//!
//! Carriers (HTTP headers, message metadata) implement [`Injector`] and
//! [`Extractor`]; a propagator reads and writes a [`SpanContext`]
//! through them without knowing the transport.
//!
//! [`SpanContext`]: crate::trace::SpanContext

mod http;

pub use http::{
    HttpPropagator, PARENT_ID_HEADER, SAMPLING_PRIORITY_HEADER, TRACE_ID_HEADER,
};

use std::collections::HashMap;

/// Write-side carrier interface.
pub trait Injector {
    /// Set a key and value on the carrier.
    fn set(&mut self, key: &str, value: String);
}

/// Read-side carrier interface.
pub trait Extractor {
    /// Get the value of a key from the carrier, if present.
    fn get(&self, key: &str) -> Option<&str>;
}

impl<S: std::hash::BuildHasher> Injector for HashMap<String, String, S> {
    fn set(&mut self, key: &str, value: String) {
        self.insert(key.to_lowercase(), value);
    }
}

impl<S: std::hash::BuildHasher> Extractor for HashMap<String, String, S> {
    fn get(&self, key: &str) -> Option<&str> {
        self.get(&key.to_lowercase()).map(|v| v.as_str())
    }
}
