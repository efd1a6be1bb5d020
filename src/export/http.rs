//! HTTP delivery of encoded span batches to a collector.

use crate::error::TraceError;
use crate::export::{Encoder, ExportResult, JsonEncoder, SpanExporter};
use crate::trace::SpanData;
use futures_util::future::BoxFuture;
use std::time::Duration;

/// Default collector endpoint.
pub const DEFAULT_COLLECTOR_ENDPOINT: &str = "http://127.0.0.1:8126/v1/spans";

/// Header carrying the number of spans in the payload.
const SPAN_COUNT_HEADER: &str = "x-tracecore-span-count";

/// Span exporter that posts one encoded body per batch to a collector
/// endpoint over HTTP.
#[derive(Debug)]
pub struct HttpSpanExporter {
    client: reqwest::blocking::Client,
    endpoint: String,
    encoder: Box<dyn Encoder>,
}

impl HttpSpanExporter {
    /// Start building an exporter with the default endpoint and encoder.
    pub fn builder() -> HttpSpanExporterBuilder {
        HttpSpanExporterBuilder::default()
    }

    /// The configured collector endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn send(&self, batch: &[SpanData]) -> ExportResult {
        if batch.is_empty() {
            return Ok(());
        }
        let body = self.encoder.encode(batch)?;
        let response = self
            .client
            .post(&self.endpoint)
            .header("content-type", self.encoder.content_type())
            .header(SPAN_COUNT_HEADER, batch.len().to_string())
            .body(body)
            .send()
            .map_err(|err| TraceError::Transport(err.to_string()))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(TraceError::Transport(format!(
                "collector returned {}",
                response.status()
            )))
        }
    }
}

impl SpanExporter for HttpSpanExporter {
    fn export(&mut self, batch: Vec<SpanData>) -> BoxFuture<'static, ExportResult> {
        // Delivery runs on the writer's dedicated thread; blocking here is
        // the contract, not an accident.
        let result = self.send(&batch);
        Box::pin(std::future::ready(result))
    }
}

/// Builder for [`HttpSpanExporter`].
#[derive(Debug)]
pub struct HttpSpanExporterBuilder {
    endpoint: String,
    encoder: Box<dyn Encoder>,
    timeout: Duration,
}

impl Default for HttpSpanExporterBuilder {
    fn default() -> Self {
        HttpSpanExporterBuilder {
            endpoint: DEFAULT_COLLECTOR_ENDPOINT.to_string(),
            encoder: Box::new(JsonEncoder),
            timeout: Duration::from_secs(10),
        }
    }
}

impl HttpSpanExporterBuilder {
    /// Assign the collector endpoint.
    pub fn with_endpoint<T: Into<String>>(mut self, endpoint: T) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Choose the wire encoding for span batches.
    pub fn with_encoder<E: Encoder + 'static>(mut self, encoder: E) -> Self {
        self.encoder = Box::new(encoder);
        self
    }

    /// Per-request timeout for collector deliveries.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the exporter.
    pub fn build(self) -> Result<HttpSpanExporter, TraceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|err| TraceError::Transport(err.to_string()))?;
        Ok(HttpSpanExporter {
            client,
            endpoint: self.endpoint,
            encoder: self.encoder,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_executor::block_on;

    #[test]
    fn builder_applies_endpoint() {
        let exporter = HttpSpanExporter::builder()
            .with_endpoint("http://collector.internal:9411/spans")
            .build()
            .unwrap();
        assert_eq!(exporter.endpoint(), "http://collector.internal:9411/spans");
    }

    #[test]
    fn default_endpoint_is_local_agent() {
        let exporter = HttpSpanExporter::builder().build().unwrap();
        assert_eq!(exporter.endpoint(), DEFAULT_COLLECTOR_ENDPOINT);
    }

    #[test]
    fn empty_batch_is_a_no_op() {
        // No listener on the endpoint; an empty batch must not touch it.
        let mut exporter = HttpSpanExporter::builder()
            .with_endpoint("http://127.0.0.1:1/spans")
            .build()
            .unwrap();
        assert!(block_on(exporter.export(Vec::new())).is_ok());
    }
}
