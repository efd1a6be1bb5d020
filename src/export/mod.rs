//! Span export: the exporter contract, wire encoders, and the built-in
//! HTTP and in-memory exporters.

mod encoder;
mod http;
mod in_memory;
mod trace;

pub use encoder::{Encoder, JsonEncoder};
pub use http::{HttpSpanExporter, HttpSpanExporterBuilder, DEFAULT_COLLECTOR_ENDPOINT};
pub use in_memory::InMemorySpanExporter;
pub use trace::{ExportResult, SpanExporter};
