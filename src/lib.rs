//! A small tracing core for instrumenting client libraries.
//!
//! `tracecore` produces [`trace::Span`]s describing individual operations
//! (a cache `get`, an HTTP request), stitches them into traces through a
//! per-thread context stack, and ships finished spans to a collector from
//! a background writer thread. Instrumentation never makes the wrapped
//! operation fail: tracing faults are logged and counted, not raised.
//!
//! # Getting started
//!
//! ```no_run
//! use tracecore::trace::{Config, Tracer};
//!
//! fn lookup(tracer: &Tracer, key: &str) -> Option<String> {
//!     tracer.in_span("get", |span| {
//!         span.set_tag("cache.key", key.to_string());
//!         None // the wrapped operation
//!     })
//! }
//!
//! let tracer = Tracer::builder()
//!     .with_config(Config::builder().with_service_name("session-cache").build())
//!     .build()
//!     .unwrap();
//!
//! lookup(&tracer, "user:42");
//!
//! // Flush buffered spans before the process exits.
//! tracer.shutdown().unwrap();
//! ```
//!
//! Per-instance routing (two clients of the same type reporting to
//! different services) goes through [`trace::Pin`]; cross-process trace
//! continuity goes through [`propagation::HttpPropagator`].

#![warn(
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    unused
)]

pub mod error;
pub mod export;
pub mod propagation;
pub mod retry;
pub mod trace;

pub use error::{TraceError, TraceResult};
