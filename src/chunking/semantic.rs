//! Embedding-driven strategy.
//!
//! Sentences are candidate segments. The similarity across every gap
//! between consecutive sentences is measured with the
//! [`EmbeddingAnalyzer`], and a chunk ends at the earliest gap whose
//! similarity falls below the threshold. When no such gap appears before
//! the budget runs out the chunk is force-cut at the last sentence that
//! fits.
//!
//! If the embedding service fails (or none is configured) the strategy
//! degrades to paragraph-aware splitting and reports a
//! [`DegradationEvent`].

use crate::chunking::StrategyConfig;
use crate::chunking::paragraph;
use crate::core::{Chunk, ChunkFlag, DegradationEvent};
use crate::embedding::{Embedder, EmbeddingAnalyzer, EmbeddingCache};
use crate::error::{EmbeddingError, Error};
use crate::text::sentence_spans;
use crate::tokenizer::Tokenizer;
use std::ops::Range;
use tracing::{debug, warn};

/// Label of the strategy used when semantic splitting degrades.
pub const FALLBACK_LABEL: &str = "paragraph";

/// Chunks produced by the semantic strategy.
#[derive(Debug)]
pub struct SemanticSplit {
    /// Produced chunks, from the fallback strategy when degraded.
    pub chunks: Vec<Chunk>,
    /// Set when the paragraph strategy had to take over.
    pub degradation: Option<DegradationEvent>,
}

/// Splits `text` at low-similarity sentence gaps.
pub fn split(
    text: &str,
    config: &StrategyConfig,
    tokenizer: &dyn Tokenizer,
    embedder: Option<&dyn Embedder>,
    label: &'static str,
) -> SemanticSplit {
    let result = match embedder {
        Some(embedder) => cut(text, config, tokenizer, embedder, label),
        None => Err(EmbeddingError::Unavailable(
            "no embedding service configured".to_string(),
        )),
    };

    match result {
        Ok(chunks) => SemanticSplit {
            chunks,
            degradation: None,
        },
        Err(err) => {
            warn!(error = %err, to = FALLBACK_LABEL, "semantic splitting degraded");
            SemanticSplit {
                chunks: paragraph::split(text, config, tokenizer, FALLBACK_LABEL),
                degradation: Some(DegradationEvent {
                    from: label.to_string(),
                    to: FALLBACK_LABEL.to_string(),
                    kind: Error::from(err.clone()).kind(),
                    reason: err.to_string(),
                }),
            }
        }
    }
}

fn cut(
    text: &str,
    config: &StrategyConfig,
    tokenizer: &dyn Tokenizer,
    embedder: &dyn Embedder,
    label: &'static str,
) -> Result<Vec<Chunk>, EmbeddingError> {
    let sentences = sentence_spans(text, 0..text.len());
    if sentences.is_empty() {
        return Ok(Vec::new());
    }

    let segments: Vec<&str> = sentences.iter().map(|s| &text[s.clone()]).collect();
    let mut cache = EmbeddingCache::new();
    let sims = EmbeddingAnalyzer::new(embedder)
        .with_window(config.semantic_window)
        .windowed_similarities(&segments, &mut cache)?;
    debug!(
        sentences = sentences.len(),
        cache_misses = cache.stats().misses,
        "measured sentence gaps"
    );

    let budget = config.chunk_size;
    let threshold = config.similarity_threshold;
    let n = sentences.len();
    let tokens = |first: usize, last: usize| {
        tokenizer.count_tokens(&text[sentences[first].start..sentences[last].end])
    };
    let emit = |first: usize, last: usize, flag: Option<ChunkFlag>| {
        let span: Range<usize> = sentences[first].start..sentences[last].end;
        let content = &text[span.clone()];
        let mut chunk = Chunk::with_strategy(
            0,
            content.to_string(),
            span,
            tokenizer.count_tokens(content),
            label,
        );
        if let Some(flag) = flag {
            chunk.flag(flag);
        }
        chunk
    };

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < n {
        if tokens(start, start) > budget {
            chunks.push(emit(start, start, Some(ChunkFlag::OversizedAtomicUnit)));
            start += 1;
            continue;
        }

        let mut end = start;
        while end + 1 < n && tokens(start, end + 1) <= budget {
            end += 1;
        }

        let boundary = (start..=end).find(|&gap| gap + 1 < n && sims[gap] < threshold);
        let (last, flag) = match boundary {
            Some(gap) => (gap, None),
            None if end + 1 == n => (end, None),
            None => (end, Some(ChunkFlag::ForcedCut)),
        };
        chunks.push(emit(start, last, flag));
        start = last + 1;
    }

    Ok(chunks)
}
