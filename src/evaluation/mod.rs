//! Evaluation of chunk sets.
//!
//! The [`MetricsEngine`] scores a [`ChunkSet`] on coherence, retrieval
//! accuracy and token efficiency. Metrics are computed independently: an
//! embedding failure while measuring coherence leaves coherence undefined
//! and is recorded, but token efficiency is still reported.

pub mod diagnostics;
pub mod metrics;
pub mod queries;
pub mod resources;

pub use diagnostics::{ChunkAnalyzer, ChunkProblem, ProblemKind};
pub use queries::{ExpectedChunk, LabeledQuery, QuerySet, QuerySetMetadata};
pub use resources::{ResourceProbe, ResourceUsage};

use crate::core::{ChunkSet, Document};
use crate::embedding::{Embedder, EmbeddingCache};
use crate::error::{EmbeddingError, Error, ErrorKind, Result};
use crate::tokenizer::Tokenizer;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Default number of top-ranked chunks a query may hit.
pub const DEFAULT_TOP_K: usize = 1;

/// Evaluation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// A query succeeds if its expected chunk ranks in the top K.
    pub top_k: usize,
    /// Measure latency and memory (disable for reproducible reports).
    pub record_resources: bool,
    /// Run the chunk-quality diagnostics.
    pub diagnostics: bool,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            record_resources: true,
            diagnostics: true,
        }
    }
}

impl EvaluationConfig {
    /// Sets K for retrieval accuracy.
    #[must_use]
    pub const fn top_k(mut self, k: usize) -> Self {
        self.top_k = k;
        self
    }

    /// Enables or disables resource recording.
    #[must_use]
    pub const fn record_resources(mut self, record: bool) -> Self {
        self.record_resources = record;
        self
    }

    /// Enables or disables diagnostics.
    #[must_use]
    pub const fn diagnostics(mut self, enabled: bool) -> Self {
        self.diagnostics = enabled;
        self
    }

    /// Validates the settings.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `top_k` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(Error::config("top_k must be >= 1"));
        }
        Ok(())
    }
}

/// A metric that could not be computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricFailure {
    /// Metric name.
    pub metric: String,
    /// Error classification.
    pub kind: ErrorKind,
    /// Error message.
    pub reason: String,
}

/// Scores for one (strategy, document) pair.
///
/// `None` means undefined (nothing to measure, or the metric failed), which
/// is distinct from a score of zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricResult {
    /// Strategy name.
    pub strategy: String,
    /// Document id.
    pub document_id: String,
    /// Adjacent-chunk coherence in `[0, 1]`.
    pub coherence: Option<f64>,
    /// Fraction of labeled queries answered in the top K.
    pub retrieval_accuracy: Option<f64>,
    /// Mean budget utilization in `[0, 1]`.
    pub token_efficiency: Option<f64>,
    /// Splitting latency in milliseconds.
    pub latency_ms: Option<f64>,
    /// Peak process memory in megabytes.
    pub peak_memory_mb: Option<f64>,
    /// Number of chunks.
    pub chunk_count: usize,
    /// Number of chunks flagged oversized.
    pub oversized_count: usize,
    /// Number of diagnostic problems found.
    pub problem_count: usize,
    /// Whether the strategy degraded while splitting.
    pub degraded: bool,
    /// Metrics that failed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<MetricFailure>,
}

impl MetricResult {
    /// Creates a result with counts filled from `set` and no scores.
    #[must_use]
    pub fn for_set(set: &ChunkSet) -> Self {
        Self {
            strategy: set.strategy.clone(),
            document_id: set.document_id.clone(),
            coherence: None,
            retrieval_accuracy: None,
            token_efficiency: None,
            latency_ms: None,
            peak_memory_mb: None,
            chunk_count: set.len(),
            oversized_count: set.oversized_count(),
            problem_count: 0,
            degraded: set.is_degraded(),
            failures: Vec::new(),
        }
    }

    /// Attaches measured resources.
    #[must_use]
    pub fn with_resources(mut self, usage: ResourceUsage) -> Self {
        self.latency_ms = Some(usage.latency_ms);
        self.peak_memory_mb = Some(usage.peak_memory_mb);
        self
    }

    fn record_failure(&mut self, metric: &str, err: EmbeddingError) {
        warn!(
            strategy = %self.strategy,
            document = %self.document_id,
            metric,
            error = %err,
            "metric failed"
        );
        let err = Error::from(err);
        self.failures.push(MetricFailure {
            metric: metric.to_string(),
            kind: err.kind(),
            reason: err.to_string(),
        });
    }
}

/// Computes metrics for chunk sets.
///
/// # Examples
///
/// ```
/// use chunkbench::chunking::{split, SplitContext, StrategyConfig};
/// use chunkbench::core::Document;
/// use chunkbench::embedding::HashEmbedder;
/// use chunkbench::evaluation::{EvaluationConfig, MetricsEngine};
/// use chunkbench::tokenizer::WordTokenizer;
///
/// let doc = Document::from_text("doc", "First topic here.\n\nSecond topic there.");
/// let set = split(&doc, &StrategyConfig::new(4), &SplitContext::new(&WordTokenizer)).unwrap();
///
/// let embedder = HashEmbedder::default();
/// let engine = MetricsEngine::new(&embedder, &WordTokenizer, EvaluationConfig::default());
/// let result = engine.evaluate(&set, &doc, None);
/// assert_eq!(result.chunk_count, 2);
/// assert!(result.coherence.is_some());
/// assert!(result.retrieval_accuracy.is_none());
/// ```
pub struct MetricsEngine<'a> {
    embedder: &'a dyn Embedder,
    tokenizer: &'a dyn Tokenizer,
    config: EvaluationConfig,
    analyzer: ChunkAnalyzer,
}

impl<'a> MetricsEngine<'a> {
    /// Creates an engine.
    #[must_use]
    pub fn new(embedder: &'a dyn Embedder, tokenizer: &'a dyn Tokenizer, config: EvaluationConfig) -> Self {
        Self {
            embedder,
            tokenizer,
            config,
            analyzer: ChunkAnalyzer::new(),
        }
    }

    /// Replaces the diagnostics analyzer.
    #[must_use]
    pub fn with_analyzer(mut self, analyzer: ChunkAnalyzer) -> Self {
        self.analyzer = analyzer;
        self
    }

    /// Returns the evaluation settings.
    #[must_use]
    pub const fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    /// Scores `set`, produced from `document`, against optional labeled
    /// queries.
    #[must_use]
    pub fn evaluate(
        &self,
        set: &ChunkSet,
        document: &Document,
        queries: Option<&[LabeledQuery]>,
    ) -> MetricResult {
        let mut result = MetricResult::for_set(set);
        let mut cache = EmbeddingCache::new();

        match metrics::coherence(&set.chunks, &document.topic_boundaries, self.embedder, &mut cache) {
            Ok(score) => result.coherence = score,
            Err(err) => result.record_failure("coherence", err),
        }

        match metrics::retrieval_accuracy(
            &set.chunks,
            queries.unwrap_or_default(),
            self.config.top_k,
            self.embedder,
            &mut cache,
        ) {
            Ok(score) => result.retrieval_accuracy = score,
            Err(err) => result.record_failure("retrieval_accuracy", err),
        }

        result.token_efficiency = metrics::token_efficiency(&set.chunks, set.budget, self.tokenizer);

        if self.config.diagnostics {
            result.problem_count = self.analyzer.analyze(&set.chunks).len();
        }

        result
    }

    /// Runs the chunk-quality diagnostics on `set`.
    #[must_use]
    pub fn diagnose(&self, set: &ChunkSet) -> Vec<ChunkProblem> {
        self.analyzer.analyze(&set.chunks)
    }
}
