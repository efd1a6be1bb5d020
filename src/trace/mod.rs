//! In-process distributed tracing.
//!
//! The pieces fit together like this: a [`Tracer`] starts [`Span`]s,
//! parenting them from the thread's [`context`] stack and sampling each
//! trace once at its root. Finished spans are handed to a [`Writer`],
//! which buffers them and exports batches on a background thread. A
//! [`Pin`] optionally binds a tracer (plus service and tag overrides) to
//! one instrumented object instance.
//!
//! ```
//! use tracecore::export::InMemorySpanExporter;
//! use tracecore::trace::Tracer;
//!
//! let exporter = InMemorySpanExporter::default();
//! let tracer = Tracer::builder()
//!     .with_exporter(exporter.clone())
//!     .build()
//!     .unwrap();
//!
//! let mut span = tracer.trace("get");
//! span.set_tag("cache.key", "user:42");
//! span.finish();
//!
//! tracer.shutdown().unwrap();
//! assert_eq!(exporter.get_finished_spans().unwrap().len(), 1);
//! ```

pub mod context;
mod config;
mod id_generator;
mod pin;
mod sampler;
mod span;
mod span_context;
mod tracer;
mod writer;

pub use config::{Config, ConfigBuilder, DEFAULT_SERVICE_NAME};
pub use id_generator::{IdGenerator, IncrementIdGenerator, RandomIdGenerator};
pub use pin::Pin;
pub use sampler::{Sampler, ShouldSample};
pub use span::{Span, SpanData};
pub use span_context::{IdParseError, SpanContext, SpanId, TraceId};
pub use tracer::{SpanBuilder, Tracer, TracerBuilder};
pub use writer::{Writer, WriterBuilder, WriterConfig};
