//! Pluggable wire encodings for span batches.
//!
//! The wire format is an external contract owned by the collector, not by
//! this core; an [`Encoder`] turns a batch of span records into one request
//! body and names its content type. [`JsonEncoder`] is the built-in format.

use crate::error::TraceError;
use crate::trace::SpanData;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Debug;
use std::time::SystemTime;

/// Serializes span batches into a collector wire format.
pub trait Encoder: Send + Sync + Debug {
    /// The content type of encoded bodies, e.g. `application/json`.
    fn content_type(&self) -> &'static str;

    /// Encode one batch into a request body.
    fn encode(&self, batch: &[SpanData]) -> Result<Vec<u8>, TraceError>;
}

/// One span as it appears on the wire: hex ids, unix-nanosecond timestamps,
/// and the error flag as 0/1.
#[derive(Serialize)]
struct SpanRecord<'a> {
    trace_id: String,
    span_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_id: Option<String>,
    service: &'a str,
    name: &'a str,
    resource: &'a str,
    start: u64,
    duration: u64,
    error: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<&'a str>,
    tags: &'a HashMap<String, String>,
}

impl<'a> From<&'a SpanData> for SpanRecord<'a> {
    fn from(span: &'a SpanData) -> Self {
        SpanRecord {
            trace_id: span.trace_id.to_string(),
            span_id: span.span_id.to_string(),
            parent_id: span.parent_id.map(|id| id.to_string()),
            service: span.service.as_ref(),
            name: span.name.as_ref(),
            resource: span.resource.as_ref(),
            start: unix_nanos(span.start_time),
            duration: span.duration.as_nanos() as u64,
            error: span.error as u8,
            error_message: span.error_message.as_deref(),
            tags: &span.tags,
        }
    }
}

fn unix_nanos(time: SystemTime) -> u64 {
    time.duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

/// JSON array-of-records encoding.
#[derive(Clone, Debug, Default)]
pub struct JsonEncoder;

impl Encoder for JsonEncoder {
    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn encode(&self, batch: &[SpanData]) -> Result<Vec<u8>, TraceError> {
        let records: Vec<SpanRecord<'_>> = batch.iter().map(SpanRecord::from).collect();
        serde_json::to_vec(&records).map_err(|err| TraceError::Encode(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::{SpanId, TraceId};
    use std::borrow::Cow;
    use std::time::Duration;

    fn sample_span() -> SpanData {
        let mut tags = HashMap::new();
        tags.insert("cache.key".to_string(), "user:42".to_string());
        SpanData {
            trace_id: TraceId::from_u128(0xabc),
            span_id: SpanId::from_u64(0xdef),
            parent_id: Some(SpanId::from_u64(0x123)),
            name: Cow::Borrowed("get"),
            resource: Cow::Borrowed("get user:42"),
            service: Cow::Borrowed("cache"),
            start_time: SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000),
            duration: Duration::from_micros(1_500),
            error: true,
            error_message: Some("connection reset".to_string()),
            tags,
        }
    }

    #[test]
    fn json_records_use_hex_ids_and_numeric_flags() {
        let body = JsonEncoder.encode(&[sample_span()]).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();

        let record = &value.as_array().unwrap()[0];
        assert_eq!(record["trace_id"], "00000000000000000000000000000abc");
        assert_eq!(record["span_id"], "0000000000000def");
        assert_eq!(record["parent_id"], "0000000000000123");
        assert_eq!(record["service"], "cache");
        assert_eq!(record["name"], "get");
        assert_eq!(record["resource"], "get user:42");
        assert_eq!(record["start"], 1_700_000_000_000_000_000u64);
        assert_eq!(record["duration"], 1_500_000);
        assert_eq!(record["error"], 1);
        assert_eq!(record["error_message"], "connection reset");
        assert_eq!(record["tags"]["cache.key"], "user:42");
    }

    #[test]
    fn root_span_omits_parent_and_error_fields() {
        let mut span = sample_span();
        span.parent_id = None;
        span.error = false;
        span.error_message = None;

        let body = JsonEncoder.encode(&[span]).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let record = &value.as_array().unwrap()[0];
        assert!(record.get("parent_id").is_none());
        assert!(record.get("error_message").is_none());
        assert_eq!(record["error"], 0);
    }

    #[test]
    fn empty_batch_encodes_to_empty_array() {
        let body = JsonEncoder.encode(&[]).unwrap();
        assert_eq!(body, b"[]");
    }
}
