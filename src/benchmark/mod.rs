//! Strategy comparison across a document set.
//!
//! A [`BenchmarkSuite`] runs every configured strategy over every document,
//! scores each result with the [`MetricsEngine`], and aggregates the scores
//! into a [`ComparisonReport`]. A failing (strategy, document) pair is
//! recorded and never aborts the run.

pub mod report;

pub use report::{
    BenchmarkFailure, ComparisonReport, CompositeWeights, DegradationRecord, MetricAggregate,
    RankedStrategy, StrategySummary,
};

use crate::chunking::{Strategy, StrategyConfig, SplitContext, split};
use crate::core::Document;
use crate::embedding::Embedder;
use crate::error::{Error, Result};
use crate::evaluation::{EvaluationConfig, MetricResult, MetricsEngine, QuerySet, ResourceProbe};
use crate::tokenizer::Tokenizer;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::time::Instant;
use tracing::{info, warn};

/// Default seed for query sampling.
pub const DEFAULT_SEED: u64 = 42;

/// A named strategy configuration under test.
///
/// The name keys the report, so the same strategy can be compared at
/// several budgets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySpec {
    /// Name used in the report.
    pub name: String,
    /// Configuration passed to the splitter.
    #[serde(flatten)]
    pub config: StrategyConfig,
}

impl StrategySpec {
    /// Creates a named spec.
    pub fn new(name: impl Into<String>, config: StrategyConfig) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }

    /// Creates a spec named after `strategy`.
    #[must_use]
    pub fn for_strategy(strategy: Strategy, chunk_size: usize) -> Self {
        Self::new(strategy.name(), StrategyConfig::for_strategy(strategy, chunk_size))
    }
}

/// Benchmark settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    /// Strategies to compare.
    pub strategies: Vec<StrategySpec>,
    /// Metric settings.
    pub evaluation: EvaluationConfig,
    /// Composite score weights.
    pub weights: CompositeWeights,
    /// Labeled queries sampled per document (all when unset).
    pub query_sample: Option<usize>,
    /// Seed for query sampling.
    pub seed: u64,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            strategies: Vec::new(),
            evaluation: EvaluationConfig::default(),
            weights: CompositeWeights::default(),
            query_sample: None,
            seed: DEFAULT_SEED,
        }
    }
}

impl BenchmarkConfig {
    /// Creates a config comparing every strategy at `chunk_size`.
    ///
    /// The overlap strategy gets an eighth of the budget as overlap.
    #[must_use]
    pub fn all_strategies(chunk_size: usize) -> Self {
        let strategies = Strategy::ALL
            .iter()
            .map(|&strategy| {
                let mut spec = StrategySpec::for_strategy(strategy, chunk_size);
                if strategy == Strategy::Overlap {
                    spec.config.overlap = (chunk_size / 8).max(1);
                }
                spec
            })
            .collect();
        Self {
            strategies,
            ..Self::default()
        }
    }

    /// Adds a strategy.
    #[must_use]
    pub fn with_strategy(mut self, spec: StrategySpec) -> Self {
        self.strategies.push(spec);
        self
    }

    /// Sets the evaluation settings.
    #[must_use]
    pub const fn evaluation(mut self, evaluation: EvaluationConfig) -> Self {
        self.evaluation = evaluation;
        self
    }

    /// Sets the composite weights.
    #[must_use]
    pub const fn weights(mut self, weights: CompositeWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Samples at most `n` queries per document.
    #[must_use]
    pub const fn query_sample(mut self, n: usize) -> Self {
        self.query_sample = Some(n);
        self
    }

    /// Sets the sampling seed.
    #[must_use]
    pub const fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Validates every part of the configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if no strategy is configured, two
    /// strategies share a name, or any strategy, weight or evaluation
    /// setting is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.strategies.is_empty() {
            return Err(Error::config("benchmark needs at least one strategy"));
        }
        let mut names = HashSet::new();
        for spec in &self.strategies {
            if spec.name.trim().is_empty() {
                return Err(Error::config("strategy name must not be empty"));
            }
            if !names.insert(spec.name.as_str()) {
                return Err(Error::config(format!("duplicate strategy name: {}", spec.name)));
            }
            spec.config.validate()?;
        }
        self.weights.validate()?;
        self.evaluation.validate()
    }
}

/// Outcome of one (strategy, document) pair.
enum PairOutcome {
    Scored(MetricResult, Vec<DegradationRecord>),
    Failed(BenchmarkFailure),
}

/// Runs strategies over documents and compares them.
///
/// # Examples
///
/// ```
/// use chunkbench::benchmark::{BenchmarkConfig, BenchmarkSuite};
/// use chunkbench::core::Document;
/// use chunkbench::embedding::HashEmbedder;
/// use chunkbench::evaluation::EvaluationConfig;
/// use chunkbench::tokenizer::WordTokenizer;
///
/// let config = BenchmarkConfig::all_strategies(16)
///     .evaluation(EvaluationConfig::default().record_resources(false));
/// let embedder = HashEmbedder::default();
/// let suite = BenchmarkSuite::new(config, &WordTokenizer, &embedder);
///
/// let docs = vec![Document::from_text("a", "One topic here.\n\nAnother topic there.")];
/// let report = suite.run(&docs, None).unwrap();
/// assert_eq!(report.strategies.len(), 7);
/// assert!(report.failures.is_empty());
/// ```
pub struct BenchmarkSuite<'a> {
    config: BenchmarkConfig,
    tokenizer: &'a dyn Tokenizer,
    embedder: &'a dyn Embedder,
}

impl<'a> BenchmarkSuite<'a> {
    /// Creates a suite.
    #[must_use]
    pub fn new(config: BenchmarkConfig, tokenizer: &'a dyn Tokenizer, embedder: &'a dyn Embedder) -> Self {
        Self {
            config,
            tokenizer,
            embedder,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    /// Runs every strategy over every document.
    ///
    /// Pairs run in parallel; results keep (strategy, document) input
    /// order. With resource recording off and a deterministic tokenizer and
    /// embedder, identical inputs give identical reports.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the config is invalid or two
    /// documents share an id. Per-pair failures are recorded in the report.
    pub fn run(&self, documents: &[Document], queries: Option<&QuerySet>) -> Result<ComparisonReport> {
        self.config.validate()?;
        let mut ids = HashSet::new();
        for document in documents {
            if !ids.insert(document.id.as_str()) {
                return Err(Error::config(format!("duplicate document id: {}", document.id)));
            }
        }

        let sampled = match (queries, self.config.query_sample) {
            (Some(set), Some(n)) => Some(set.sample(n, self.config.seed)),
            (Some(set), None) => Some(set.clone()),
            (None, _) => None,
        };

        info!(
            strategies = self.config.strategies.len(),
            documents = documents.len(),
            queries = sampled.as_ref().map_or(0, QuerySet::len),
            "starting benchmark"
        );
        let started = Instant::now();

        let engine = MetricsEngine::new(self.embedder, self.tokenizer, self.config.evaluation.clone());
        let pairs: Vec<(&StrategySpec, &Document)> = self
            .config
            .strategies
            .iter()
            .flat_map(|spec| documents.iter().map(move |doc| (spec, doc)))
            .collect();

        let outcomes: Vec<PairOutcome> = pairs
            .par_iter()
            .map(|(spec, document)| self.run_pair(&engine, spec, document, sampled.as_ref()))
            .collect();

        let report = self.aggregate(outcomes);
        info!(
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            failures = report.failures.len(),
            best = report.best_strategy().unwrap_or("-"),
            "benchmark finished"
        );
        Ok(report)
    }

    fn run_pair(
        &self,
        engine: &MetricsEngine<'_>,
        spec: &StrategySpec,
        document: &Document,
        queries: Option<&QuerySet>,
    ) -> PairOutcome {
        let ctx = SplitContext::new(self.tokenizer).with_embedder(self.embedder);
        let probe = self.config.evaluation.record_resources.then(ResourceProbe::start);

        let mut set = match split(document, &spec.config, &ctx) {
            Ok(set) => set,
            Err(err) => {
                warn!(
                    strategy = %spec.name,
                    document = %document.id,
                    error = %err,
                    "strategy failed on document"
                );
                return PairOutcome::Failed(BenchmarkFailure {
                    strategy: spec.name.clone(),
                    document_id: document.id.clone(),
                    kind: err.kind(),
                    reason: err.to_string(),
                });
            }
        };
        let usage = probe.map(ResourceProbe::finish);
        set.strategy.clone_from(&spec.name);

        let degradations = set
            .degradations
            .iter()
            .map(|event| DegradationRecord {
                strategy: spec.name.clone(),
                document_id: document.id.clone(),
                event: event.clone(),
            })
            .collect();

        let mut result = engine.evaluate(&set, document, queries.and_then(|q| q.for_document(&document.id)));
        if let Some(usage) = usage {
            result = result.with_resources(usage);
        }
        PairOutcome::Scored(result, degradations)
    }

    fn aggregate(&self, outcomes: Vec<PairOutcome>) -> ComparisonReport {
        let mut results = Vec::new();
        let mut failures = Vec::new();
        let mut degradations = Vec::new();
        for outcome in outcomes {
            match outcome {
                PairOutcome::Scored(result, events) => {
                    results.push(result);
                    degradations.extend(events);
                }
                PairOutcome::Failed(failure) => failures.push(failure),
            }
        }

        let weights = self.config.weights;
        let strategies: BTreeMap<String, StrategySummary> = self
            .config
            .strategies
            .iter()
            .map(|spec| {
                let scored: Vec<&MetricResult> = results.iter().filter(|r| r.strategy == spec.name).collect();
                let failed = failures.iter().filter(|f| f.strategy == spec.name).count();
                let summary = StrategySummary::from_results(
                    spec.config.resolve_strategy().name(),
                    spec.config.chunk_size,
                    &scored,
                    failed,
                    &weights,
                );
                (spec.name.clone(), summary)
            })
            .collect();

        ComparisonReport {
            ranking: ComparisonReport::rank(&strategies),
            strategies,
            results,
            failures,
            degradations,
            weights,
        }
    }
}
