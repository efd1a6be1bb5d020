//! # Writer
//!
//! The writer decouples span production, which happens synchronously on the
//! hot path of instrumented operations, from span export, which is network
//! I/O to a collector. Producers pay for an in-memory append under a briefly
//! held lock and nothing else: the lock is never held across an export, a
//! full buffer evicts its oldest span instead of blocking, and all delivery
//! runs on one dedicated background thread.
//!
//! ```ascii
//!   Tracer ── Span::finish ──> bounded buffer ──> worker thread ──> SpanExporter
//!                              (drop oldest        (interval or
//!                               on overflow)        batch threshold)
//! ```
//!
//! Delivery failures are retried with bounded backoff; a batch that still
//! cannot be delivered is dropped and counted. Span loss is acceptable,
//! blocking the host application is not.

use crate::error::{TraceError, TraceResult};
use crate::export::SpanExporter;
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::trace::SpanData;
use futures_executor::block_on;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, RecvTimeoutError, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Default maximum number of buffered spans.
pub(crate) const DEFAULT_MAX_BUFFER_SIZE: usize = 2_048;
/// Default number of spans per exported batch.
pub(crate) const DEFAULT_MAX_EXPORT_BATCH_SIZE: usize = 512;
/// Default delay between two consecutive periodic flushes.
pub(crate) const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);
/// Default deadline for explicit flush and shutdown requests.
pub(crate) const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(5);

/// Writer configuration.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Maximum number of spans held in the buffer. On overflow the oldest
    /// span is evicted and counted as dropped.
    pub(crate) max_buffer_size: usize,
    /// Maximum number of spans per exported batch. Reaching this many
    /// buffered spans also nudges the worker awake early. Clamped to
    /// `max_buffer_size` so a full buffer always triggers a flush.
    pub(crate) max_export_batch_size: usize,
    /// Delay between two consecutive periodic flushes.
    pub(crate) flush_interval: Duration,
    /// Deadline for `force_flush`.
    pub(crate) flush_timeout: Duration,
    /// Deadline for the final flush during `shutdown`.
    pub(crate) shutdown_timeout: Duration,
    /// Retry behavior for failed batch deliveries.
    pub(crate) retry_policy: RetryPolicy,
}

impl Default for WriterConfig {
    fn default() -> Self {
        WriterConfig {
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
            max_export_batch_size: DEFAULT_MAX_EXPORT_BATCH_SIZE,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            flush_timeout: DEFAULT_OPERATION_TIMEOUT,
            shutdown_timeout: DEFAULT_OPERATION_TIMEOUT,
            retry_policy: RetryPolicy::default(),
        }
    }
}

/// Bounded span queue with oldest-first eviction.
#[derive(Debug)]
pub(crate) struct SpanBuffer {
    spans: VecDeque<SpanData>,
    max_size: usize,
}

impl SpanBuffer {
    fn new(max_size: usize) -> Self {
        let max_size = max_size.max(1);
        SpanBuffer {
            spans: VecDeque::with_capacity(max_size.min(1_024)),
            max_size,
        }
    }

    /// Append a span, evicting the oldest one if the buffer is full.
    /// Returns true when an eviction happened.
    fn push(&mut self, span: SpanData) -> bool {
        let evicted = if self.spans.len() >= self.max_size {
            self.spans.pop_front();
            true
        } else {
            false
        };
        self.spans.push_back(span);
        evicted
    }

    fn drain_batch(&mut self, max_batch: usize) -> Vec<SpanData> {
        let n = self.spans.len().min(max_batch.max(1));
        self.spans.drain(..n).collect()
    }

    fn len(&self) -> usize {
        self.spans.len()
    }

    fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}

/// Messages exchanged between producers and the worker thread.
#[derive(Debug)]
enum ControlMessage {
    Wake,
    ForceFlush(SyncSender<TraceResult<()>>),
    Shutdown(SyncSender<TraceResult<()>>),
}

#[derive(Debug)]
struct WriterShared {
    buffer: Mutex<SpanBuffer>,
    handle: Mutex<Option<thread::JoinHandle<()>>>,
    is_shutdown: AtomicBool,
    dropped: AtomicUsize,
}

/// Buffers finished spans and flushes them to an exporter on a dedicated
/// background thread.
///
/// Cheap to clone; all clones share one buffer and one worker. Dropping
/// every clone without calling [`shutdown`](Writer::shutdown) lets the
/// worker make a final best-effort flush and exit.
#[derive(Clone, Debug)]
pub struct Writer {
    shared: Arc<WriterShared>,
    sender: SyncSender<ControlMessage>,
    config: WriterConfig,
}

impl Writer {
    /// Create a writer flushing to `exporter` with default configuration.
    pub fn new<E>(exporter: E, mut config: WriterConfig) -> Self
    where
        E: SpanExporter + 'static,
    {
        // A batch can never be larger than the buffer; without this clamp a
        // small buffer would fill, evict, and still sit below the wake
        // threshold until the next interval tick.
        config.max_export_batch_size = config.max_export_batch_size.min(config.max_buffer_size);
        let (sender, receiver) = sync_channel(16);
        let shared = Arc::new(WriterShared {
            buffer: Mutex::new(SpanBuffer::new(config.max_buffer_size)),
            handle: Mutex::new(None),
            is_shutdown: AtomicBool::new(false),
            dropped: AtomicUsize::new(0),
        });

        let worker_shared = Arc::clone(&shared);
        let worker_config = config.clone();
        let handle = thread::Builder::new()
            .name("tracecore-writer".to_string())
            .spawn(move || run_worker(exporter, worker_shared, receiver, worker_config))
            .expect("failed to spawn writer thread");
        if let Ok(mut slot) = shared.handle.lock() {
            *slot = Some(handle);
        }

        Writer {
            shared,
            sender,
            config,
        }
    }

    /// Start building a writer around `exporter`.
    pub fn builder<E>(exporter: E) -> WriterBuilder<E>
    where
        E: SpanExporter + 'static,
    {
        WriterBuilder {
            exporter,
            config: WriterConfig::default(),
        }
    }

    /// Number of spans lost so far, to overflow eviction or to delivery
    /// failure after retry exhaustion. Monotonic.
    pub fn dropped_spans(&self) -> usize {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    /// Append a finished span. Never blocks and never fails toward the
    /// caller; worst case the oldest buffered span is evicted.
    pub(crate) fn enqueue(&self, span: SpanData) {
        if self.shared.is_shutdown.load(Ordering::Relaxed) {
            self.shared.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(name: "Writer.EnqueueAfterShutdown", "span enqueued after shutdown");
            return;
        }
        let reached_batch_size = match self.shared.buffer.lock() {
            Ok(mut buffer) => {
                if buffer.push(span) {
                    // Warn on the first drop only; the counter carries the rest.
                    if self.shared.dropped.fetch_add(1, Ordering::Relaxed) == 0 {
                        tracing::warn!(
                            name: "Writer.SpanDroppingStarted",
                            message = "span buffer is full; evicting oldest spans",
                        );
                    }
                }
                buffer.len() >= self.config.max_export_batch_size
            }
            Err(_) => {
                // The span is lost either way; keep the drop metric honest.
                self.shared.dropped.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };
        if reached_batch_size {
            let _ = self.sender.try_send(ControlMessage::Wake);
        }
    }

    /// Flush all buffered spans now, waiting up to the flush timeout.
    pub fn force_flush(&self) -> TraceResult<()> {
        if self.shared.is_shutdown.load(Ordering::Relaxed) {
            return Err(TraceError::AlreadyShutdown);
        }
        let (reply, receiver) = sync_channel(1);
        self.sender
            .try_send(ControlMessage::ForceFlush(reply))
            .map_err(|_| TraceError::Other("failed to send flush request to writer".into()))?;
        receiver
            .recv_timeout(self.config.flush_timeout)
            .map_err(|_| TraceError::ExportTimedOut(self.config.flush_timeout))?
    }

    /// Shut the writer down: attempt a final flush within the shutdown
    /// timeout, then stop the worker. Spans still unflushed after the
    /// timeout are discarded. Terminal; later calls return
    /// [`TraceError::AlreadyShutdown`] and later spans are dropped.
    pub fn shutdown(&self) -> TraceResult<()> {
        if self.shared.is_shutdown.swap(true, Ordering::Relaxed) {
            return Err(TraceError::AlreadyShutdown);
        }
        let (reply, receiver) = sync_channel(1);
        self.sender
            .try_send(ControlMessage::Shutdown(reply))
            .map_err(|_| TraceError::Other("failed to send shutdown request to writer".into()))?;
        let result = receiver
            .recv_timeout(self.config.shutdown_timeout)
            .map_err(|_| TraceError::ExportTimedOut(self.config.shutdown_timeout))?;
        if let Ok(mut slot) = self.shared.handle.lock() {
            if let Some(handle) = slot.take() {
                let _ = handle.join();
            }
        }
        result
    }
}

/// Builder for [`Writer`].
#[derive(Debug)]
pub struct WriterBuilder<E>
where
    E: SpanExporter + 'static,
{
    exporter: E,
    config: WriterConfig,
}

impl<E> WriterBuilder<E>
where
    E: SpanExporter + 'static,
{
    /// Maximum number of buffered spans; the oldest is evicted on overflow.
    pub fn with_max_buffer_size(mut self, max_buffer_size: usize) -> Self {
        self.config.max_buffer_size = max_buffer_size.max(1);
        self
    }

    /// Maximum number of spans per exported batch.
    pub fn with_max_export_batch_size(mut self, max_export_batch_size: usize) -> Self {
        self.config.max_export_batch_size = max_export_batch_size.max(1);
        self
    }

    /// Delay between two consecutive periodic flushes.
    pub fn with_flush_interval(mut self, flush_interval: Duration) -> Self {
        self.config.flush_interval = flush_interval;
        self
    }

    /// Deadline for `force_flush`.
    pub fn with_flush_timeout(mut self, flush_timeout: Duration) -> Self {
        self.config.flush_timeout = flush_timeout;
        self
    }

    /// Deadline for the final flush during `shutdown`.
    pub fn with_shutdown_timeout(mut self, shutdown_timeout: Duration) -> Self {
        self.config.shutdown_timeout = shutdown_timeout;
        self
    }

    /// Retry behavior for failed batch deliveries.
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.config.retry_policy = retry_policy;
        self
    }

    /// Build the writer and start its worker thread.
    pub fn build(self) -> Writer {
        Writer::new(self.exporter, self.config)
    }
}

fn run_worker<E: SpanExporter>(
    mut exporter: E,
    shared: Arc<WriterShared>,
    receiver: Receiver<ControlMessage>,
    config: WriterConfig,
) {
    let mut last_export = Instant::now();
    loop {
        let timeout = config.flush_interval.saturating_sub(last_export.elapsed());
        match receiver.recv_timeout(timeout) {
            Ok(ControlMessage::Wake) => {
                let _ = flush(&mut exporter, &shared, &config);
                last_export = Instant::now();
            }
            Ok(ControlMessage::ForceFlush(reply)) => {
                let result = flush(&mut exporter, &shared, &config);
                let _ = reply.send(result);
                last_export = Instant::now();
            }
            Ok(ControlMessage::Shutdown(reply)) => {
                let result = flush(&mut exporter, &shared, &config);
                exporter.shutdown();
                let _ = reply.send(result);
                break;
            }
            Err(RecvTimeoutError::Timeout) => {
                let _ = flush(&mut exporter, &shared, &config);
                last_export = Instant::now();
            }
            Err(RecvTimeoutError::Disconnected) => {
                // Every Writer handle is gone; make one last attempt.
                let _ = flush(&mut exporter, &shared, &config);
                exporter.shutdown();
                break;
            }
        }
    }
}

/// Drain the buffer batch by batch. The buffer lock is released before each
/// export, so producers keep appending while a batch is on the wire; spans
/// that arrive mid-flush are picked up by the next iteration.
fn flush<E: SpanExporter>(
    exporter: &mut E,
    shared: &WriterShared,
    config: &WriterConfig,
) -> TraceResult<()> {
    let mut result = Ok(());
    loop {
        let batch = match shared.buffer.lock() {
            Ok(mut buffer) => {
                if buffer.is_empty() {
                    break;
                }
                buffer.drain_batch(config.max_export_batch_size)
            }
            Err(err) => return Err(TraceError::from(err)),
        };
        let batch_size = batch.len();
        let export_result = retry_with_backoff(&config.retry_policy, "SpanBatchExport", || {
            block_on(exporter.export(batch.clone()))
        });
        if let Err(err) = export_result {
            shared.dropped.fetch_add(batch_size, Ordering::Relaxed);
            tracing::warn!(
                name: "Writer.BatchDropped",
                dropped = batch_size,
                reason = err.to_string(),
            );
            if result.is_ok() {
                result = Err(err);
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::{ExportResult, InMemorySpanExporter};
    use crate::trace::{SpanId, TraceId};
    use futures_util::future::BoxFuture;
    use std::borrow::Cow;
    use std::collections::HashMap;
    use std::time::SystemTime;

    fn test_span(name: &str) -> SpanData {
        SpanData {
            trace_id: TraceId::from_u128(1),
            span_id: SpanId::from_u64(1),
            parent_id: None,
            name: Cow::Owned(name.to_string()),
            resource: Cow::Owned(name.to_string()),
            service: Cow::Borrowed("test"),
            start_time: SystemTime::now(),
            duration: Duration::from_millis(1),
            error: false,
            error_message: None,
            tags: HashMap::new(),
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_retries: 1,
            initial_delay_ms: 1,
            max_delay_ms: 2,
            jitter_ms: 1,
        }
    }

    #[derive(Debug)]
    struct FailingExporter;

    impl SpanExporter for FailingExporter {
        fn export(&mut self, _batch: Vec<SpanData>) -> BoxFuture<'static, ExportResult> {
            Box::pin(std::future::ready(Err(TraceError::Transport(
                "collector unreachable".into(),
            ))))
        }
    }

    /// Stalls every export until the gate opens, so tests can overfill the
    /// buffer while a delivery is in flight.
    #[derive(Debug, Clone)]
    struct GatedExporter {
        open: Arc<AtomicBool>,
        export_calls: Arc<AtomicUsize>,
        delegate: InMemorySpanExporter,
    }

    impl GatedExporter {
        fn new(delegate: InMemorySpanExporter) -> Self {
            GatedExporter {
                open: Arc::new(AtomicBool::new(false)),
                export_calls: Arc::new(AtomicUsize::new(0)),
                delegate,
            }
        }
    }

    impl SpanExporter for GatedExporter {
        fn export(&mut self, batch: Vec<SpanData>) -> BoxFuture<'static, ExportResult> {
            self.export_calls.fetch_add(1, Ordering::SeqCst);
            while !self.open.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(1));
            }
            self.delegate.export(batch)
        }
    }

    #[test]
    fn span_buffer_evicts_oldest_first() {
        let mut buffer = SpanBuffer::new(4);
        let mut evictions = 0;
        for i in 1..=6 {
            if buffer.push(test_span(&format!("span-{i}"))) {
                evictions += 1;
            }
        }
        assert_eq!(evictions, 2);
        assert_eq!(buffer.len(), 4);
        let names: Vec<_> = buffer.drain_batch(10).into_iter().map(|s| s.name).collect();
        assert_eq!(names, ["span-3", "span-4", "span-5", "span-6"]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn force_flush_exports_pending_spans() {
        let exporter = InMemorySpanExporter::default();
        let writer = Writer::builder(exporter.clone())
            .with_flush_interval(Duration::from_secs(60))
            .build();

        writer.enqueue(test_span("pending"));
        writer.force_flush().unwrap();

        let spans = exporter.get_finished_spans().unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].name, "pending");
        let _ = writer.shutdown();
    }

    #[test]
    fn periodic_flush_exports_without_explicit_request() {
        let exporter = InMemorySpanExporter::default();
        let writer = Writer::builder(exporter.clone())
            .with_flush_interval(Duration::from_millis(50))
            .build();

        writer.enqueue(test_span("timed"));
        std::thread::sleep(Duration::from_millis(500));

        assert_eq!(exporter.get_finished_spans().unwrap().len(), 1);
        let _ = writer.shutdown();
    }

    #[test]
    fn overflow_drops_oldest_and_counts() {
        let delegate = InMemorySpanExporter::default();
        let exporter = GatedExporter::new(delegate.clone());
        let gate = Arc::clone(&exporter.open);
        let export_calls = Arc::clone(&exporter.export_calls);
        let writer = Writer::builder(exporter)
            .with_max_buffer_size(4)
            .with_flush_interval(Duration::from_secs(60))
            .build();

        for i in 1..=4 {
            writer.enqueue(test_span(&format!("span-{i}")));
        }
        // Wait until the worker has taken the first batch, then overfill
        // the buffer while that delivery is stalled.
        while export_calls.load(Ordering::SeqCst) == 0 {
            thread::sleep(Duration::from_millis(1));
        }
        for i in 5..=10 {
            writer.enqueue(test_span(&format!("span-{i}")));
        }
        assert_eq!(writer.dropped_spans(), 2);

        gate.store(true, Ordering::SeqCst);
        writer.force_flush().unwrap();
        let names: Vec<_> = delegate
            .get_finished_spans()
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        // span-5 and span-6 were the oldest buffered spans when the buffer
        // overflowed; everything else arrived intact and in order.
        assert_eq!(
            names,
            [
                "span-1", "span-2", "span-3", "span-4", "span-7", "span-8", "span-9", "span-10",
            ]
        );
        assert_eq!(writer.dropped_spans(), 2);
        let _ = writer.shutdown();
    }

    #[test]
    fn batch_threshold_is_clamped_to_the_buffer_size() {
        let exporter = InMemorySpanExporter::default();
        let writer = Writer::builder(exporter.clone())
            .with_max_buffer_size(4)
            .with_flush_interval(Duration::from_secs(60))
            .build();
        // The default 512-span batch could never be reached by a 4-span
        // buffer; the effective threshold must shrink with it.
        assert_eq!(writer.config.max_export_batch_size, 4);

        for i in 1..=8 {
            writer.enqueue(test_span(&format!("span-{i}")));
        }
        // Flushed by the buffer filling up, not the 60s interval.
        for _ in 0..100 {
            if !exporter.get_finished_spans().unwrap().is_empty() {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        assert!(!exporter.get_finished_spans().unwrap().is_empty());

        writer.force_flush().unwrap();
        let exported = exporter.get_finished_spans().unwrap().len();
        assert_eq!(exported + writer.dropped_spans(), 8);
        let _ = writer.shutdown();
    }

    #[test]
    fn poisoned_buffer_still_counts_dropped_spans() {
        let writer = Writer::builder(InMemorySpanExporter::default())
            .with_flush_interval(Duration::from_secs(60))
            .build();

        let shared = Arc::clone(&writer.shared);
        let _ = thread::spawn(move || {
            let _guard = shared.buffer.lock().unwrap();
            panic!("poison the buffer lock");
        })
        .join();

        writer.enqueue(test_span("lost"));
        assert_eq!(writer.dropped_spans(), 1);
    }

    #[test]
    fn shutdown_flushes_and_is_terminal() {
        let exporter = InMemorySpanExporter::default();
        let writer = Writer::builder(exporter.clone())
            .with_flush_interval(Duration::from_secs(60))
            .build();

        writer.enqueue(test_span("final"));
        writer.shutdown().unwrap();
        assert_eq!(exporter.get_finished_spans().unwrap().len(), 1);

        assert!(matches!(
            writer.shutdown(),
            Err(TraceError::AlreadyShutdown)
        ));
        assert!(matches!(
            writer.force_flush(),
            Err(TraceError::AlreadyShutdown)
        ));

        let dropped_before = writer.dropped_spans();
        writer.enqueue(test_span("late"));
        assert_eq!(writer.dropped_spans(), dropped_before + 1);
    }

    #[test]
    fn exhausted_retries_drop_the_batch_and_count() {
        let writer = Writer::builder(FailingExporter)
            .with_flush_interval(Duration::from_secs(60))
            .with_retry_policy(fast_retry())
            .build();

        writer.enqueue(test_span("doomed-1"));
        writer.enqueue(test_span("doomed-2"));
        let result = writer.force_flush();
        assert!(matches!(result, Err(TraceError::Transport(_))));
        assert_eq!(writer.dropped_spans(), 2);
        let _ = writer.shutdown();
    }

    #[test]
    fn reaching_batch_size_wakes_the_worker_early() {
        let exporter = InMemorySpanExporter::default();
        let writer = Writer::builder(exporter.clone())
            .with_max_export_batch_size(3)
            .with_flush_interval(Duration::from_secs(60))
            .build();

        for i in 1..=3 {
            writer.enqueue(test_span(&format!("span-{i}")));
        }
        // Flushed by the batch-size nudge, not the 60s interval.
        for _ in 0..100 {
            if exporter.get_finished_spans().unwrap().len() == 3 {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(exporter.get_finished_spans().unwrap().len(), 3);
        let _ = writer.shutdown();
    }
}
