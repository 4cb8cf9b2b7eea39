//! Batch processing pipeline.
//!
//! A [`Pipeline`] parses, chunks and optionally embeds every document of a
//! [`Batch`] independently. Documents run concurrently on a bounded worker
//! pool: a [`Semaphore`] with `max_concurrency` permits gates dispatch and
//! the CPU work runs on Tokio's blocking pool. Transient failures are
//! retried with the configured [`RetryPolicy`]; any other failure is
//! recorded for that document without affecting the rest of the batch.

pub mod events;
pub mod run;

pub use events::{MonitoringHook, NoopHook, PipelineEvent, TracingHook};
pub use run::{DocumentOutcome, OutcomeError, OutcomeStatus, PipelineRun, ProcessedDocument};

use crate::chunking::{SplitContext, StrategyConfig, split};
use crate::core::DocumentFormat;
use crate::embedding::SharedEmbedder;
use crate::error::{ChunkingError, Error, PipelineError, Result};
use crate::parser::{PlainTextParser, SharedParser};
use crate::retry::RetryPolicy;
use crate::tokenizer::SharedTokenizer;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tokio::sync::{Notify, Semaphore, mpsc};
use tokio::task::{JoinHandle, JoinSet};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

/// Default number of documents processed at once.
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Default capacity of the streaming outcome channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Pipeline settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Documents processed concurrently.
    pub max_concurrency: usize,
    /// Retry policy for transient failures.
    pub retry: RetryPolicy,
    /// Embed every chunk after splitting (requires an embedder).
    pub embed_chunks: bool,
    /// Fail a document when any chunk is flagged oversized.
    pub reject_oversized: bool,
    /// Outcomes buffered for a streaming consumer.
    pub channel_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            retry: RetryPolicy::default(),
            embed_chunks: false,
            reject_oversized: false,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl PipelineConfig {
    /// Sets the concurrency limit.
    #[must_use]
    pub const fn max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = n;
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub const fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Enables chunk embedding.
    #[must_use]
    pub const fn embed_chunks(mut self, enabled: bool) -> Self {
        self.embed_chunks = enabled;
        self
    }

    /// Enables rejection of oversized chunks.
    #[must_use]
    pub const fn reject_oversized(mut self, enabled: bool) -> Self {
        self.reject_oversized = enabled;
        self
    }

    /// Validates the settings.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if concurrency or channel capacity is
    /// zero, or the retry policy is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            return Err(Error::config("max_concurrency must be >= 1"));
        }
        if self.channel_capacity == 0 {
            return Err(Error::config("channel_capacity must be >= 1"));
        }
        self.retry.validate()
    }
}

/// Raw input document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument {
    /// Document identifier, unique within a batch.
    pub id: String,
    /// Undecoded content.
    pub bytes: Vec<u8>,
    /// Declared format.
    pub format: DocumentFormat,
}

impl RawDocument {
    /// Creates a raw document.
    pub fn new(id: impl Into<String>, bytes: impl Into<Vec<u8>>, format: DocumentFormat) -> Self {
        Self {
            id: id.into(),
            bytes: bytes.into(),
            format,
        }
    }

    /// Creates a plain-text document.
    pub fn text(id: impl Into<String>, text: &str) -> Self {
        Self::new(id, text.as_bytes(), DocumentFormat::PlainText)
    }
}

/// Documents processed together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    /// Batch identifier.
    pub id: String,
    /// Documents in submission order.
    pub documents: Vec<RawDocument>,
}

impl Batch {
    /// Creates an empty batch.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            documents: Vec::new(),
        }
    }

    /// Adds a document.
    #[must_use]
    pub fn with_document(mut self, document: RawDocument) -> Self {
        self.documents.push(document);
        self
    }

    /// Adds a document.
    pub fn push(&mut self, document: RawDocument) {
        self.documents.push(document);
    }

    /// Number of documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Returns true if the batch has no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn check_unique_ids(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for document in &self.documents {
            if !seen.insert(document.id.as_str()) {
                return Err(PipelineError::DuplicateDocument {
                    id: document.id.clone(),
                }
                .into());
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Stops dispatch of documents that have not started.
///
/// In-flight documents run to completion; undispatched ones are reported
/// as cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancellationHandle {
    inner: Arc<CancelState>,
}

impl CancellationHandle {
    /// Creates a handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Returns true once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Completes when cancellation is requested.
    pub async fn cancelled(&self) {
        let mut notified = std::pin::pin!(self.inner.notify.notified());
        notified.as_mut().enable();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}

/// Chunking pipeline over batches of raw documents.
///
/// # Examples
///
/// ```
/// use chunkbench::chunking::StrategyConfig;
/// use chunkbench::pipeline::{Batch, Pipeline, RawDocument};
/// use chunkbench::tokenizer::WordTokenizer;
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() {
/// let pipeline = Pipeline::new(StrategyConfig::new(16), Arc::new(WordTokenizer));
/// let batch = Batch::new("b1")
///     .with_document(RawDocument::text("a", "First paragraph.\n\nSecond one."))
///     .with_document(RawDocument::text("b", "Only one."));
/// let run = pipeline.process(batch).await.unwrap();
/// assert_eq!(run.succeeded(), 2);
/// # }
/// ```
#[derive(Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    strategy: StrategyConfig,
    tokenizer: SharedTokenizer,
    embedder: Option<SharedEmbedder>,
    parser: SharedParser,
    hook: Arc<dyn MonitoringHook>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("strategy", &self.strategy)
            .field("tokenizer", &self.tokenizer.name())
            .field("embedder", &self.embedder.as_ref().map(|e| e.name().to_string()))
            .field("parser", &self.parser.name())
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Creates a pipeline with the plain-text parser, no embedder and no
    /// monitoring.
    #[must_use]
    pub fn new(strategy: StrategyConfig, tokenizer: SharedTokenizer) -> Self {
        Self {
            config: PipelineConfig::default(),
            strategy,
            tokenizer,
            embedder: None,
            parser: Arc::new(PlainTextParser),
            hook: Arc::new(NoopHook),
        }
    }

    /// Sets the pipeline settings.
    #[must_use]
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the embedding service.
    #[must_use]
    pub fn with_embedder(mut self, embedder: SharedEmbedder) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Sets the structural parser.
    #[must_use]
    pub fn with_parser(mut self, parser: SharedParser) -> Self {
        self.parser = parser;
        self
    }

    /// Sets the monitoring hook.
    #[must_use]
    pub fn with_hook(mut self, hook: Arc<dyn MonitoringHook>) -> Self {
        self.hook = hook;
        self
    }

    /// Returns the pipeline settings.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Returns the strategy configuration.
    #[must_use]
    pub const fn strategy(&self) -> &StrategyConfig {
        &self.strategy
    }

    /// Validates pipeline and strategy settings.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if either is invalid, or chunk
    /// embedding is enabled without an embedder.
    pub fn validate(&self) -> Result<()> {
        self.config.validate()?;
        self.strategy.validate()?;
        if self.config.embed_chunks && self.embedder.is_none() {
            return Err(Error::config("embed_chunks requires an embedder"));
        }
        Ok(())
    }

    /// Parses, chunks and optionally embeds one document on the current
    /// thread, without retries.
    ///
    /// # Errors
    ///
    /// Returns a parse error for undecodable input, a chunking error for
    /// invalid structure or rejected oversized chunks, and an embedding
    /// error if chunk embedding fails.
    pub fn process_document(&self, raw: &RawDocument) -> Result<ProcessedDocument> {
        let document = self.parser.parse(&raw.id, &raw.bytes, raw.format)?;

        let mut ctx = SplitContext::new(self.tokenizer.as_ref());
        if let Some(embedder) = &self.embedder {
            ctx = ctx.with_embedder(embedder.as_ref());
        }
        let chunks = split(&document, &self.strategy, &ctx)?;

        if self.config.reject_oversized
            && let Some(chunk) = chunks.iter().find(|c| c.is_oversized())
        {
            return Err(ChunkingError::OversizedAtomicUnit {
                tokens: chunk.token_count,
                budget: chunks.budget,
                start: chunk.start(),
                end: chunk.end(),
            }
            .into());
        }

        let embeddings = match &self.embedder {
            Some(embedder) if self.config.embed_chunks => {
                let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
                embedder.embed_batch(&texts)?
            }
            _ => Vec::new(),
        };

        Ok(ProcessedDocument { chunks, embeddings })
    }

    /// Processes a batch and returns its run record.
    ///
    /// # Errors
    ///
    /// Returns a configuration error before processing anything if the
    /// settings are invalid or two documents share an id. Per-document
    /// failures are recorded in the run.
    pub async fn process(&self, batch: Batch) -> Result<PipelineRun> {
        self.process_with_cancellation(batch, CancellationHandle::new()).await
    }

    /// Processes a batch until done or until `cancel` fires.
    ///
    /// # Errors
    ///
    /// Same as [`Pipeline::process`].
    pub async fn process_with_cancellation(&self, batch: Batch, cancel: CancellationHandle) -> Result<PipelineRun> {
        self.drive(batch, cancel, None).await
    }

    /// Processes a batch in the background, streaming each outcome as it
    /// completes.
    ///
    /// The stream ends once every document has an outcome; the handle
    /// yields the full run record. Must be called inside a Tokio runtime.
    /// Workers wait when the stream is not consumed and its buffer is full.
    pub fn process_streaming(
        &self,
        batch: Batch,
        cancel: CancellationHandle,
    ) -> (ReceiverStream<DocumentOutcome>, JoinHandle<Result<PipelineRun>>) {
        let (tx, rx) = mpsc::channel(self.config.channel_capacity.max(1));
        let pipeline = self.clone();
        let handle = tokio::spawn(async move { pipeline.drive(batch, cancel, Some(tx)).await });
        (ReceiverStream::new(rx), handle)
    }

    async fn drive(
        &self,
        batch: Batch,
        cancel: CancellationHandle,
        updates: Option<mpsc::Sender<DocumentOutcome>>,
    ) -> Result<PipelineRun> {
        self.validate()?;
        batch.check_unique_ids()?;

        let started = Instant::now();
        let run_id = format!("run-{:016x}", rand::random::<u64>());
        let batch_id = batch.id.clone();
        info!(
            run = %run_id,
            batch = %batch_id,
            documents = batch.len(),
            concurrency = self.config.max_concurrency,
            "processing batch"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency));
        let mut tasks = JoinSet::new();
        let mut dispatched = Vec::new();
        let mut undispatched = Vec::new();

        for raw in batch.documents {
            if cancel.is_cancelled() {
                undispatched.push(raw.id);
                continue;
            }
            let permit = tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                permit = semaphore.clone().acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                undispatched.push(raw.id);
                continue;
            };

            let pipeline = self.clone();
            let batch_id = batch_id.clone();
            let updates = updates.clone();
            dispatched.push(raw.id.clone());
            tasks.spawn(async move {
                let outcome = pipeline.run_document(&batch_id, raw).await;
                drop(permit);
                if let Some(tx) = updates {
                    let _ = tx.send(outcome.clone()).await;
                }
                outcome
            });
        }

        let mut outcomes = BTreeMap::new();
        let mut worker_errors = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => {
                    outcomes.insert(outcome.document_id.clone(), outcome);
                }
                Err(err) => worker_errors.push(err.to_string()),
            }
        }

        // A worker that died took its document id with it; every dispatched
        // document without an outcome is attributed one of the errors.
        let mut worker_errors = worker_errors.into_iter();
        for document_id in dispatched {
            if outcomes.contains_key(&document_id) {
                continue;
            }
            let failure: Error = PipelineError::WorkerFailed {
                reason: worker_errors.next().unwrap_or_else(|| "worker exited".to_string()),
            }
            .into();
            self.report_failure(&batch_id, &document_id, &failure, 1);
            let outcome = DocumentOutcome::failed(document_id, 1, &failure);
            if let Some(tx) = &updates {
                let _ = tx.send(outcome.clone()).await;
            }
            outcomes.insert(outcome.document_id.clone(), outcome);
        }

        for document_id in undispatched {
            debug!(batch = %batch_id, document = %document_id, "document cancelled");
            self.hook.on_event(&PipelineEvent::DocumentCancelled {
                batch_id: batch_id.clone(),
                document_id: document_id.clone(),
            });
            let outcome = DocumentOutcome::cancelled(document_id);
            if let Some(tx) = &updates {
                let _ = tx.send(outcome.clone()).await;
            }
            outcomes.insert(outcome.document_id.clone(), outcome);
        }

        let run = PipelineRun {
            run_id,
            batch_id,
            outcomes,
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            cancelled: cancel.is_cancelled(),
        };
        self.hook.on_event(&PipelineEvent::BatchCompleted {
            batch_id: run.batch_id.clone(),
            succeeded: run.succeeded(),
            failed: run.failed() + run.cancelled_count(),
            cancelled: run.cancelled,
        });
        info!(
            run = %run.run_id,
            succeeded = run.succeeded(),
            failed = run.failed(),
            cancelled = run.cancelled_count(),
            duration_ms = run.duration_ms,
            "batch finished"
        );
        Ok(run)
    }

    async fn run_document(&self, batch_id: &str, raw: RawDocument) -> DocumentOutcome {
        let raw = Arc::new(raw);
        let attempted = self
            .config
            .retry
            .run(|attempt| {
                self.hook.on_event(&PipelineEvent::DocumentStarted {
                    batch_id: batch_id.to_string(),
                    document_id: raw.id.clone(),
                    attempt,
                });
                let pipeline = self.clone();
                let raw = Arc::clone(&raw);
                async move {
                    tokio::task::spawn_blocking(move || pipeline.process_document(&raw))
                        .await
                        .unwrap_or_else(|err| {
                            Err(PipelineError::WorkerFailed {
                                reason: err.to_string(),
                            }
                            .into())
                        })
                }
            })
            .await;

        match attempted.result {
            Ok(output) => {
                debug!(document = %raw.id, chunks = output.chunks.len(), "document chunked");
                self.hook.on_event(&PipelineEvent::DocumentSucceeded {
                    batch_id: batch_id.to_string(),
                    document_id: raw.id.clone(),
                    chunk_count: output.chunks.len(),
                    attempts: attempted.attempts,
                });
                DocumentOutcome::succeeded(raw.id.clone(), attempted.attempts, output)
            }
            Err(err) => {
                self.report_failure(batch_id, &raw.id, &err, attempted.attempts);
                DocumentOutcome::failed(raw.id.clone(), attempted.attempts, &err)
            }
        }
    }

    fn report_failure(&self, batch_id: &str, document_id: &str, err: &Error, attempts: u32) {
        warn!(
            batch = %batch_id,
            document = %document_id,
            kind = %err.kind(),
            attempts,
            error = %err,
            "document failed"
        );
        self.hook.on_event(&PipelineEvent::DocumentFailed {
            batch_id: batch_id.to_string(),
            document_id: document_id.to_string(),
            kind: err.kind(),
            reason: err.to_string(),
            attempts,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::Strategy;
    use crate::embedding::{Embedder, EmbeddingResult};
    use crate::error::{EmbeddingError, ErrorKind};
    use crate::tokenizer::WordTokenizer;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicU32;
    use tokio_stream::StreamExt;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<PipelineEvent>>,
    }

    impl MonitoringHook for Recorder {
        fn on_event(&self, event: &PipelineEvent) {
            if let Ok(mut events) = self.events.lock() {
                events.push(event.clone());
            }
        }
    }

    impl Recorder {
        fn count(&self, pred: impl Fn(&PipelineEvent) -> bool) -> usize {
            self.events.lock().unwrap().iter().filter(|e| pred(e)).count()
        }
    }

    /// Times out `failures` times, then embeds.
    struct Flaky {
        failures: u32,
        calls: AtomicU32,
    }

    impl Flaky {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
            }
        }
    }

    impl Embedder for Flaky {
        fn dimensions(&self) -> usize {
            2
        }

        fn embed(&self, _text: &str) -> EmbeddingResult<Vec<f32>> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                Err(EmbeddingError::Timeout { after_ms: 5 })
            } else {
                Ok(vec![1.0, 0.0])
            }
        }

        fn embed_batch(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                Err(EmbeddingError::Timeout { after_ms: 5 })
            } else {
                Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
            }
        }
    }

    fn fast_retry(attempts: u32) -> RetryPolicy {
        RetryPolicy::default().max_attempts(attempts).base_delay_ms(1).max_delay_ms(2)
    }

    fn pipeline() -> Pipeline {
        Pipeline::new(StrategyConfig::new(16), Arc::new(WordTokenizer))
    }

    fn five_documents() -> Batch {
        let mut batch = Batch::new("batch-1");
        for i in 1..=5 {
            let doc = if i == 3 {
                RawDocument::new("doc-3", vec![b'o', b'k', 0xff, 0xfe], DocumentFormat::PlainText)
            } else {
                RawDocument::text(format!("doc-{i}"), "Some text here.\n\nMore text there.")
            };
            batch.push(doc);
        }
        batch
    }

    #[tokio::test]
    async fn test_parse_failure_isolated() {
        let recorder = Arc::new(Recorder::default());
        let pipeline = pipeline().with_hook(recorder.clone());
        let run = pipeline.process(five_documents()).await.unwrap();

        assert_eq!(run.succeeded(), 4);
        assert_eq!(run.failed(), 1);
        let failed = run.outcome("doc-3").unwrap();
        assert_eq!(failed.error_kind(), Some(ErrorKind::ParseFailure));
        assert_eq!(failed.attempts, 1);
        assert_eq!(
            recorder.count(|e| matches!(e, PipelineEvent::BatchCompleted { .. })),
            1
        );
        assert_eq!(
            recorder.count(|e| matches!(e, PipelineEvent::DocumentStarted { .. })),
            5
        );
    }

    #[tokio::test]
    async fn test_transient_failure_retried() {
        let pipeline = pipeline()
            .with_embedder(Arc::new(Flaky::new(2)))
            .with_config(PipelineConfig::default().embed_chunks(true).retry(fast_retry(3)));
        let batch = Batch::new("b").with_document(RawDocument::text("a", "One.\n\nTwo."));
        let run = pipeline.process(batch).await.unwrap();

        let outcome = run.outcome("a").unwrap();
        assert!(outcome.is_success());
        assert_eq!(outcome.attempts, 3);
        let output = outcome.output.as_ref().unwrap();
        assert_eq!(output.embeddings.len(), output.chunks.len());
    }

    #[tokio::test]
    async fn test_retries_exhausted() {
        let pipeline = pipeline()
            .with_embedder(Arc::new(Flaky::new(u32::MAX)))
            .with_config(PipelineConfig::default().embed_chunks(true).retry(fast_retry(2)));
        let batch = Batch::new("b").with_document(RawDocument::text("a", "One."));
        let run = pipeline.process(batch).await.unwrap();

        let outcome = run.outcome("a").unwrap();
        assert_eq!(outcome.status, OutcomeStatus::Failed);
        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.error_kind(), Some(ErrorKind::EmbeddingServiceUnavailable));
    }

    #[tokio::test]
    async fn test_reject_oversized() {
        let pipeline = Pipeline::new(StrategyConfig::for_strategy(Strategy::Hierarchy, 3), Arc::new(WordTokenizer))
            .with_config(PipelineConfig::default().reject_oversized(true));
        let batch = Batch::new("b").with_document(RawDocument::new(
            "table",
            "| a | b | c | d |".as_bytes(),
            DocumentFormat::Table,
        ));
        let run = pipeline.process(batch).await.unwrap();
        let outcome = run.outcome("table").unwrap();
        assert_eq!(outcome.error_kind(), Some(ErrorKind::OversizedAtomicUnit));
        assert_eq!(outcome.attempts, 1);
    }

    #[tokio::test]
    async fn test_duplicate_ids_rejected() {
        let batch = Batch::new("b")
            .with_document(RawDocument::text("a", "x"))
            .with_document(RawDocument::text("a", "y"));
        let err = pipeline().process(batch).await.unwrap_err();
        assert_eq!(err.to_string(), "pipeline error: duplicate document id in batch: a");
    }

    #[tokio::test]
    async fn test_invalid_config_fails_fast() {
        let err = pipeline()
            .with_config(PipelineConfig::default().max_concurrency(0))
            .process(five_documents())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigurationInvalid);

        let err = pipeline()
            .with_config(PipelineConfig::default().embed_chunks(true))
            .process(five_documents())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("embed_chunks requires an embedder"));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let cancel = CancellationHandle::new();
        cancel.cancel();
        let recorder = Arc::new(Recorder::default());
        let run = pipeline()
            .with_hook(recorder.clone())
            .process_with_cancellation(five_documents(), cancel)
            .await
            .unwrap();
        assert_eq!(run.cancelled_count(), 5);
        assert!(run.cancelled);
        assert!(run.outcomes.values().all(|o| o.attempts == 0));
        assert!(run.outcomes.values().all(|o| o.error_kind() == Some(ErrorKind::Cancelled)));
        assert_eq!(
            recorder.count(|e| matches!(e, PipelineEvent::DocumentCancelled { .. })),
            5
        );
        assert_eq!(
            recorder.count(|e| matches!(e, PipelineEvent::DocumentFailed { .. })),
            0
        );
    }

    #[tokio::test]
    async fn test_cancel_stops_dispatch_keeps_completed() {
        let cancel = CancellationHandle::new();
        let trigger = cancel.clone();
        let hook = move |event: &PipelineEvent| {
            if matches!(event, PipelineEvent::DocumentSucceeded { .. }) {
                trigger.cancel();
            }
        };
        let pipeline = pipeline()
            .with_config(PipelineConfig::default().max_concurrency(1))
            .with_hook(Arc::new(hook));
        let mut batch = Batch::new("b");
        for i in 0..4 {
            batch.push(RawDocument::text(format!("d{i}"), "Text."));
        }

        let run = pipeline.process_with_cancellation(batch, cancel).await.unwrap();
        assert_eq!(run.succeeded(), 1);
        assert!(run.outcome("d0").unwrap().is_success());
        assert_eq!(run.cancelled_count(), 3);
    }

    #[tokio::test]
    async fn test_streaming_yields_every_outcome() {
        let (stream, handle) = pipeline().process_streaming(five_documents(), CancellationHandle::new());
        let streamed: Vec<DocumentOutcome> = stream.collect().await;
        let run = handle.await.unwrap().unwrap();

        assert_eq!(streamed.len(), 5);
        let mut ids: Vec<_> = streamed.iter().map(|o| o.document_id.clone()).collect();
        ids.sort();
        assert_eq!(ids, run.outcomes.keys().cloned().collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let run = pipeline().process(Batch::new("empty")).await.unwrap();
        assert!(run.outcomes.is_empty());
        assert!(!run.cancelled);
    }

    #[tokio::test]
    async fn test_cancelled_future_resolves() {
        let cancel = CancellationHandle::new();
        let waiter = cancel.clone();
        let task = tokio::spawn(async move { waiter.cancelled().await });
        cancel.cancel();
        task.await.unwrap();
        assert!(cancel.is_cancelled());
    }
}
