//! Quality metrics for a chunk set.
//!
//! - **Coherence**: similarity of adjacent chunks, inverted across
//!   author-marked topic boundaries
//! - **Retrieval accuracy**: fraction of labeled queries whose expected
//!   chunk ranks in the top K by similarity
//! - **Token efficiency**: how much of the budget chunks actually use
//!
//! A metric with nothing to measure is `None`, never zero.

use crate::core::Chunk;
use crate::embedding::{Embedder, EmbeddingCache, EmbeddingResult, similarity};
use crate::evaluation::LabeledQuery;
use crate::tokenizer::Tokenizer;
use std::cmp::Ordering;

/// Mean adjacent-pair coherence.
///
/// Each adjacent pair scores its similarity `s`, or `1 - s` when an
/// author-marked topic boundary falls between the two chunk starts. A
/// single chunk scores 1; no chunks is undefined.
///
/// # Errors
///
/// Propagates embedding failures.
pub fn coherence(
    chunks: &[Chunk],
    topic_boundaries: &[usize],
    embedder: &dyn Embedder,
    cache: &mut EmbeddingCache,
) -> EmbeddingResult<Option<f64>> {
    match chunks.len() {
        0 => return Ok(None),
        1 => return Ok(Some(1.0)),
        _ => {}
    }

    let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
    let vectors = cache.embed_all(embedder, &texts)?;

    let scores: Vec<f64> = chunks
        .windows(2)
        .zip(vectors.windows(2))
        .map(|(pair, vecs)| {
            let s = f64::from(similarity(&vecs[0], &vecs[1]));
            if straddles(&pair[0], &pair[1], topic_boundaries) {
                1.0 - s
            } else {
                s
            }
        })
        .collect();

    Ok(mean(&scores))
}

/// Returns true if a topic boundary lies in `(a.start, b.start]`.
fn straddles(a: &Chunk, b: &Chunk, boundaries: &[usize]) -> bool {
    boundaries
        .iter()
        .any(|&boundary| a.start() < boundary && boundary <= b.start())
}

/// Chunk indices ordered by similarity to `query` (descending), ties broken
/// by chunk position.
#[must_use]
pub fn rank_chunks(query: &[f32], chunk_vectors: &[impl AsRef<[f32]>]) -> Vec<usize> {
    let scores: Vec<f32> = chunk_vectors
        .iter()
        .map(|v| similarity(query, v.as_ref()))
        .collect();
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(Ordering::Equal)
            .then(a.cmp(&b))
    });
    order
}

/// Fraction of `queries` whose expected chunk is among the `top_k` most
/// similar chunks.
///
/// Undefined when there are no queries. With queries but no chunks, every
/// query misses.
///
/// # Errors
///
/// Propagates embedding failures.
#[allow(clippy::cast_precision_loss)]
pub fn retrieval_accuracy(
    chunks: &[Chunk],
    queries: &[LabeledQuery],
    top_k: usize,
    embedder: &dyn Embedder,
    cache: &mut EmbeddingCache,
) -> EmbeddingResult<Option<f64>> {
    if queries.is_empty() {
        return Ok(None);
    }
    if chunks.is_empty() {
        return Ok(Some(0.0));
    }

    let chunk_texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
    let chunk_vectors = cache.embed_all(embedder, &chunk_texts)?;
    let query_texts: Vec<&str> = queries.iter().map(|q| q.query.as_str()).collect();
    let query_vectors = cache.embed_all(embedder, &query_texts)?;

    let hits = queries
        .iter()
        .zip(&query_vectors)
        .filter(|(query, vector)| {
            rank_chunks(vector, &chunk_vectors)
                .into_iter()
                .take(top_k.max(1))
                .any(|i| query.expected.matches(&chunks[i]))
        })
        .count();

    Ok(Some(hits as f64 / queries.len() as f64))
}

/// Mean over chunks of `min(content tokens / budget, 1)`.
///
/// Whitespace tokens do not count as content.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn token_efficiency(chunks: &[Chunk], budget: usize, tokenizer: &dyn Tokenizer) -> Option<f64> {
    if budget == 0 {
        return None;
    }
    let ratios: Vec<f64> = chunks
        .iter()
        .map(|c| (tokenizer.count_content_tokens(&c.content) as f64 / budget as f64).min(1.0))
        .collect();
    mean(&ratios)
}

/// Arithmetic mean, `None` for an empty slice.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
