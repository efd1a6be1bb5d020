//! The entry point for producing spans.
//!
//! A [`Tracer`] owns the sampling decision, id generation, and the
//! [`Writer`] spans are handed to when they finish. Tracers are cheap to
//! clone; clones share the same writer and worker thread.

use crate::error::TraceResult;
use crate::export::{HttpSpanExporter, SpanExporter};
use crate::retry::RetryPolicy;
use crate::trace::id_generator::{IdGenerator, RandomIdGenerator};
use crate::trace::sampler::{Sampler, ShouldSample};
use crate::trace::{context, Config, Span, SpanContext, SpanData, Writer};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Produces spans and hands finished spans to a background [`Writer`].
#[derive(Clone, Debug)]
pub struct Tracer {
    inner: Arc<TracerInner>,
}

#[derive(Debug)]
struct TracerInner {
    service_name: Cow<'static, str>,
    sampler: Box<dyn ShouldSample>,
    id_generator: Box<dyn IdGenerator>,
    writer: Writer,
}

impl Tracer {
    /// Start building a tracer.
    pub fn builder() -> TracerBuilder {
        TracerBuilder::default()
    }

    /// The service this tracer reports spans under.
    pub fn service_name(&self) -> &str {
        &self.inner.service_name
    }

    /// The writer finished spans are handed to.
    pub fn writer(&self) -> &Writer {
        &self.inner.writer
    }

    /// Start a span with the given operation name and default options.
    ///
    /// The span becomes the current span on this thread until it finishes.
    pub fn trace(&self, name: impl Into<Cow<'static, str>>) -> Span {
        self.span_builder(name).start()
    }

    /// Start building a span, for callers that need to set the resource,
    /// service, tags, or an explicit remote parent before starting it.
    pub fn span_builder(&self, name: impl Into<Cow<'static, str>>) -> SpanBuilder<'_> {
        SpanBuilder {
            tracer: self,
            name: name.into(),
            resource: None,
            service: None,
            tags: HashMap::new(),
            remote_parent: None,
        }
    }

    /// Run `f` inside a span named `name`, finishing the span when `f`
    /// returns.
    pub fn in_span<T, F>(&self, name: impl Into<Cow<'static, str>>, f: F) -> T
    where
        F: FnOnce(&mut Span) -> T,
    {
        let mut span = self.trace(name);
        let result = f(&mut span);
        span.finish();
        result
    }

    /// Flag `span` as errored with `err`'s display form. The error still
    /// belongs to the caller; tracing never swallows it.
    pub fn record_exception<E>(&self, span: &mut Span, err: &E)
    where
        E: Display + ?Sized,
    {
        span.set_error(err);
    }

    /// Deliver all buffered spans now, blocking until the export completes.
    pub fn force_flush(&self) -> TraceResult<()> {
        self.inner.writer.force_flush()
    }

    /// Flush remaining spans and stop the background worker.
    pub fn shutdown(&self) -> TraceResult<()> {
        self.inner.writer.shutdown()
    }
}

/// Configures a span before it starts.
#[derive(Debug)]
#[must_use = "a span builder does nothing until start() is called"]
pub struct SpanBuilder<'a> {
    tracer: &'a Tracer,
    name: Cow<'static, str>,
    resource: Option<Cow<'static, str>>,
    service: Option<Cow<'static, str>>,
    tags: HashMap<String, String>,
    remote_parent: Option<SpanContext>,
}

impl SpanBuilder<'_> {
    /// The resource being operated on, e.g. a cache key pattern or SQL
    /// statement. Defaults to the operation name.
    pub fn with_resource(mut self, resource: impl Into<Cow<'static, str>>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Report this span under a different service than the tracer's.
    pub fn with_service(mut self, service: impl Into<Cow<'static, str>>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Attach a tag to the span at start.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Continue a trace extracted from an incoming request instead of the
    /// thread's current span.
    pub fn with_remote_parent(mut self, parent: SpanContext) -> Self {
        self.remote_parent = Some(parent);
        self
    }

    /// Start the span and make it current on this thread.
    ///
    /// The parent is the explicit remote parent if one was set, otherwise
    /// the thread's current span. A root span is sampled here, once for
    /// the whole trace; children inherit the decision through their
    /// parent's context.
    pub fn start(self) -> Span {
        let inner = &self.tracer.inner;
        let parent = self.remote_parent.or_else(context::current);
        let (trace_id, sampled, parent_id) = match &parent {
            Some(parent) => (parent.trace_id(), parent.is_sampled(), Some(parent.span_id())),
            None => {
                let trace_id = inner.id_generator.new_trace_id();
                let sampled = inner.sampler.should_sample(trace_id, self.name.as_ref());
                (trace_id, sampled, None)
            }
        };
        let span_id = inner.id_generator.new_span_id();
        let span_context = SpanContext::new(trace_id, span_id, sampled);

        let data = if sampled {
            Some(SpanData {
                trace_id,
                span_id,
                parent_id,
                resource: self.resource.unwrap_or_else(|| self.name.clone()),
                service: self.service.unwrap_or_else(|| inner.service_name.clone()),
                name: self.name,
                start_time: SystemTime::now(),
                duration: Duration::ZERO,
                error: false,
                error_message: None,
                tags: self.tags,
            })
        } else {
            None
        };

        context::push(span_context.clone());
        Span::new(span_context, data, inner.writer.clone())
    }
}

/// Builder for [`Tracer`].
#[derive(Debug, Default)]
pub struct TracerBuilder {
    config: Option<Config>,
    sampler: Option<Box<dyn ShouldSample>>,
    id_generator: Option<Box<dyn IdGenerator>>,
    exporter: Option<Box<dyn SpanExporter>>,
    writer: Option<Writer>,
}

impl TracerBuilder {
    /// Use `config` instead of [`Config::default`].
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Replace the ratio sampler derived from the configuration.
    pub fn with_sampler<S: ShouldSample + 'static>(mut self, sampler: S) -> Self {
        self.sampler = Some(Box::new(sampler));
        self
    }

    /// Replace the random id generator.
    pub fn with_id_generator<G: IdGenerator + 'static>(mut self, id_generator: G) -> Self {
        self.id_generator = Some(Box::new(id_generator));
        self
    }

    /// Export spans with `exporter` instead of the HTTP exporter aimed at
    /// the configured collector endpoint.
    pub fn with_exporter<E: SpanExporter + 'static>(mut self, exporter: E) -> Self {
        self.exporter = Some(Box::new(exporter));
        self
    }

    /// Use an existing writer rather than spawning a new one. Takes
    /// precedence over `with_exporter`.
    pub fn with_writer(mut self, writer: Writer) -> Self {
        self.writer = Some(writer);
        self
    }

    /// Build the tracer, spawning its writer thread unless one was supplied.
    pub fn build(self) -> TraceResult<Tracer> {
        let config = self.config.unwrap_or_default();

        let sampler = self
            .sampler
            .unwrap_or_else(|| Box::new(Sampler::TraceIdRatioBased(config.sampling_rate)));
        let id_generator = self
            .id_generator
            .unwrap_or_else(|| Box::<RandomIdGenerator>::default());

        let writer = match self.writer {
            Some(writer) => writer,
            None => {
                let exporter: Box<dyn SpanExporter> = match self.exporter {
                    Some(exporter) => exporter,
                    None => Box::new(
                        HttpSpanExporter::builder()
                            .with_endpoint(config.collector_endpoint.as_str())
                            .build()?,
                    ),
                };
                Writer::builder(exporter)
                    .with_max_buffer_size(config.max_buffer_size)
                    .with_flush_interval(config.flush_interval)
                    .with_retry_policy(RetryPolicy {
                        max_retries: config.max_retries,
                        ..RetryPolicy::default()
                    })
                    .build()
            }
        };

        Ok(Tracer {
            inner: Arc::new(TracerInner {
                service_name: config.service_name,
                sampler,
                id_generator,
                writer,
            }),
        })
    }
}
