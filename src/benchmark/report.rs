//! Comparison report and aggregation.

use crate::core::DegradationEvent;
use crate::error::{Error, ErrorKind, Result};
use crate::evaluation::MetricResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Default weight of coherence in the composite score.
pub const DEFAULT_COHERENCE_WEIGHT: f64 = 0.4;

/// Default weight of retrieval accuracy in the composite score.
pub const DEFAULT_RETRIEVAL_WEIGHT: f64 = 0.4;

/// Default weight of token efficiency in the composite score.
pub const DEFAULT_EFFICIENCY_WEIGHT: f64 = 0.2;

/// Mean and population variance of one metric across documents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricAggregate {
    /// Mean of the defined values.
    pub mean: Option<f64>,
    /// Population variance of the defined values.
    pub variance: Option<f64>,
    /// Number of defined values.
    pub samples: usize,
    /// Number of undefined values skipped.
    pub undefined: usize,
}

impl MetricAggregate {
    /// Aggregates values, skipping and counting undefined ones.
    ///
    /// # Examples
    ///
    /// ```
    /// use chunkbench::benchmark::MetricAggregate;
    ///
    /// let agg = MetricAggregate::from_values([Some(1.0), None, Some(3.0)]);
    /// assert_eq!(agg.mean, Some(2.0));
    /// assert_eq!(agg.variance, Some(1.0));
    /// assert_eq!(agg.samples, 2);
    /// assert_eq!(agg.undefined, 1);
    /// ```
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_values(values: impl IntoIterator<Item = Option<f64>>) -> Self {
        let mut defined = Vec::new();
        let mut undefined = 0;
        for value in values {
            match value {
                Some(v) if v.is_finite() => defined.push(v),
                _ => undefined += 1,
            }
        }

        if defined.is_empty() {
            return Self {
                mean: None,
                variance: None,
                samples: 0,
                undefined,
            };
        }

        let n = defined.len() as f64;
        let mean = defined.iter().sum::<f64>() / n;
        let variance = defined.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Self {
            mean: Some(mean),
            variance: Some(variance),
            samples: defined.len(),
            undefined,
        }
    }
}

/// Weights of the composite ranking score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeWeights {
    /// Weight of mean coherence.
    pub coherence: f64,
    /// Weight of mean retrieval accuracy.
    pub retrieval_accuracy: f64,
    /// Weight of mean token efficiency.
    pub token_efficiency: f64,
}

impl Default for CompositeWeights {
    fn default() -> Self {
        Self {
            coherence: DEFAULT_COHERENCE_WEIGHT,
            retrieval_accuracy: DEFAULT_RETRIEVAL_WEIGHT,
            token_efficiency: DEFAULT_EFFICIENCY_WEIGHT,
        }
    }
}

impl CompositeWeights {
    /// Creates weights.
    #[must_use]
    pub const fn new(coherence: f64, retrieval_accuracy: f64, token_efficiency: f64) -> Self {
        Self {
            coherence,
            retrieval_accuracy,
            token_efficiency,
        }
    }

    /// Validates the weights.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a weight is negative or not finite,
    /// or all weights are zero.
    pub fn validate(&self) -> Result<()> {
        let weights = [self.coherence, self.retrieval_accuracy, self.token_efficiency];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(Error::config("composite weights must be finite and >= 0"));
        }
        if weights.iter().sum::<f64>() <= 0.0 {
            return Err(Error::config("at least one composite weight must be > 0"));
        }
        Ok(())
    }

    /// Weighted mean of the defined metric means.
    ///
    /// Weights are renormalized over the metrics that are defined, so an
    /// unlabeled benchmark still ranks on coherence and efficiency.
    #[must_use]
    pub fn score(&self, coherence: Option<f64>, retrieval: Option<f64>, efficiency: Option<f64>) -> Option<f64> {
        let parts = [
            (self.coherence, coherence),
            (self.retrieval_accuracy, retrieval),
            (self.token_efficiency, efficiency),
        ];
        let (weighted, total) = parts
            .iter()
            .filter_map(|(w, v)| v.map(|v| (w * v, *w)))
            .fold((0.0, 0.0), |(sum, total), (wv, w)| (sum + wv, total + w));
        (total > 0.0).then(|| weighted / total)
    }
}

/// Aggregated metrics for one strategy across all documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySummary {
    /// Strategy variant that produced the chunks.
    pub strategy: String,
    /// Token budget.
    pub chunk_size: usize,
    /// Documents evaluated successfully.
    pub documents: usize,
    /// Documents that failed.
    pub failures: usize,
    /// Documents where the strategy degraded.
    pub degradations: usize,
    /// Coherence across documents.
    pub coherence: MetricAggregate,
    /// Retrieval accuracy across documents.
    pub retrieval_accuracy: MetricAggregate,
    /// Token efficiency across documents.
    pub token_efficiency: MetricAggregate,
    /// Splitting latency across documents.
    pub latency_ms: MetricAggregate,
    /// Peak memory across documents.
    pub peak_memory_mb: MetricAggregate,
    /// Chunks per document.
    pub chunk_count: MetricAggregate,
    /// Oversized chunks over all documents.
    pub oversized_chunks: usize,
    /// Weighted composite of the metric means.
    pub composite: Option<f64>,
}

impl StrategySummary {
    /// Summarizes the results of one strategy.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_results(
        strategy: &str,
        chunk_size: usize,
        results: &[&MetricResult],
        failures: usize,
        weights: &CompositeWeights,
    ) -> Self {
        let coherence = MetricAggregate::from_values(results.iter().map(|r| r.coherence));
        let retrieval_accuracy = MetricAggregate::from_values(results.iter().map(|r| r.retrieval_accuracy));
        let token_efficiency = MetricAggregate::from_values(results.iter().map(|r| r.token_efficiency));
        let composite = weights.score(coherence.mean, retrieval_accuracy.mean, token_efficiency.mean);

        Self {
            strategy: strategy.to_string(),
            chunk_size,
            documents: results.len(),
            failures,
            degradations: results.iter().filter(|r| r.degraded).count(),
            coherence,
            retrieval_accuracy,
            token_efficiency,
            latency_ms: MetricAggregate::from_values(results.iter().map(|r| r.latency_ms)),
            peak_memory_mb: MetricAggregate::from_values(results.iter().map(|r| r.peak_memory_mb)),
            chunk_count: MetricAggregate::from_values(results.iter().map(|r| Some(r.chunk_count as f64))),
            oversized_chunks: results.iter().map(|r| r.oversized_count).sum(),
            composite,
        }
    }
}

/// A (strategy, document) pair that failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkFailure {
    /// Strategy name.
    pub strategy: String,
    /// Document id.
    pub document_id: String,
    /// Error classification.
    pub kind: ErrorKind,
    /// Error message.
    pub reason: String,
}

/// A fallback taken while splitting one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegradationRecord {
    /// Strategy name.
    pub strategy: String,
    /// Document id.
    pub document_id: String,
    /// What happened.
    pub event: DegradationEvent,
}

/// Position of a strategy in the ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedStrategy {
    /// 1-based rank.
    pub rank: usize,
    /// Strategy name.
    pub name: String,
    /// Composite score, if any metric was defined.
    pub score: Option<f64>,
}

/// Result of a benchmark run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    /// Per-strategy aggregates, keyed by strategy name.
    pub strategies: BTreeMap<String, StrategySummary>,
    /// Strategies by composite score, best first.
    pub ranking: Vec<RankedStrategy>,
    /// Per-pair results in (strategy, document) input order.
    pub results: Vec<MetricResult>,
    /// Pairs that failed.
    pub failures: Vec<BenchmarkFailure>,
    /// Fallbacks taken.
    pub degradations: Vec<DegradationRecord>,
    /// Weights used for the composite.
    pub weights: CompositeWeights,
}

impl ComparisonReport {
    /// Ranks `strategies` by composite score (descending), ties and
    /// undefined scores ordered by name.
    #[must_use]
    pub fn rank(strategies: &BTreeMap<String, StrategySummary>) -> Vec<RankedStrategy> {
        let mut entries: Vec<(&String, Option<f64>)> =
            strategies.iter().map(|(name, s)| (name, s.composite)).collect();
        entries.sort_by(|(name_a, a), (name_b, b)| {
            match (a, b) {
                (Some(a), Some(b)) => b.total_cmp(a),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            }
            .then_with(|| name_a.cmp(name_b))
        });
        entries
            .into_iter()
            .enumerate()
            .map(|(i, (name, score))| RankedStrategy {
                rank: i + 1,
                name: name.clone(),
                score,
            })
            .collect()
    }

    /// Name of the top-ranked strategy with a defined score.
    #[must_use]
    pub fn best_strategy(&self) -> Option<&str> {
        self.ranking
            .iter()
            .find(|r| r.score.is_some())
            .map(|r| r.name.as_str())
    }

    /// Results for one strategy, in document order.
    pub fn results_for<'a>(&'a self, strategy: &'a str) -> impl Iterator<Item = &'a MetricResult> + 'a {
        self.results.iter().filter(move |r| r.strategy == strategy)
    }

    /// Serializes the report to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses a report from JSON.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Renders the ranking as a plain-text table.
    #[must_use]
    pub fn render_text(&self) -> String {
        fn cell(value: Option<f64>) -> String {
            value.map_or_else(|| "-".to_string(), |v| format!("{v:.3}"))
        }

        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:<4} {:<20} {:<10} {:>6} {:>9} {:>9} {:>10} {:>9} {:>7}",
            "rank", "strategy", "variant", "size", "score", "coherence", "retrieval", "efficiency", "chunks"
        );
        for ranked in &self.ranking {
            let Some(summary) = self.strategies.get(&ranked.name) else {
                continue;
            };
            let _ = writeln!(
                out,
                "{:<4} {:<20} {:<10} {:>6} {:>9} {:>9} {:>10} {:>9} {:>7}",
                ranked.rank,
                ranked.name,
                summary.strategy,
                summary.chunk_size,
                cell(ranked.score),
                cell(summary.coherence.mean),
                cell(summary.retrieval_accuracy.mean),
                cell(summary.token_efficiency.mean),
                cell(summary.chunk_count.mean),
            );
        }
        if !self.failures.is_empty() {
            let _ = writeln!(out, "\nfailures:");
            for failure in &self.failures {
                let _ = writeln!(
                    out,
                    "  {} / {}: {} ({})",
                    failure.strategy, failure.document_id, failure.kind, failure.reason
                );
            }
        }
        if !self.degradations.is_empty() {
            let _ = writeln!(out, "\ndegradations:");
            for record in &self.degradations {
                let _ = writeln!(
                    out,
                    "  {} / {}: {} -> {} ({})",
                    record.strategy, record.document_id, record.event.from, record.event.to, record.event.reason
                );
            }
        }
        out
    }
}
