//! Embedding service boundary and the analyzer built on it.
//!
//! The embedding model is an external collaborator behind the [`Embedder`]
//! trait. Failures are classified as [`EmbeddingError`]s so callers can
//! tell transient unavailability (timeouts, rate limits) from permanent
//! failures.
//!
//! # Feature Flags
//!
//! - `fastembed-embeddings`: Enables `FastEmbed` with all-MiniLM-L6-v2 (384 dimensions)
//! - Without the feature: Uses the hash-based embedder (deterministic but lexical)

mod analyzer;
mod cache;
mod hashed;
mod retrying;

#[cfg(feature = "fastembed-embeddings")]
mod fastembed_impl;

pub use analyzer::EmbeddingAnalyzer;
pub use cache::{CacheStats, EmbeddingCache};
pub use hashed::HashEmbedder;
pub use retrying::RetryingEmbedder;

#[cfg(feature = "fastembed-embeddings")]
pub use fastembed_impl::FastEmbedEmbedder;

use crate::error::EmbeddingError;
use std::sync::Arc;

/// Result type for embedding service calls.
pub type EmbeddingResult<T> = std::result::Result<T, EmbeddingError>;

/// Shared, thread-safe embedder handle.
pub type SharedEmbedder = Arc<dyn Embedder>;

/// Default embedding dimensions for the all-MiniLM-L6-v2 model.
pub const DEFAULT_DIMENSIONS: usize = 384;

/// Trait for embedding services.
///
/// Implementations must be thread-safe (`Send + Sync`); the benchmark
/// evaluates strategy/document pairs in parallel against one embedder.
///
/// # Examples
///
/// ```
/// use chunkbench::embedding::{Embedder, HashEmbedder, DEFAULT_DIMENSIONS};
///
/// let embedder = HashEmbedder::new(DEFAULT_DIMENSIONS);
/// let embedding = embedder.embed("Hello, world!").unwrap();
/// assert_eq!(embedding.len(), DEFAULT_DIMENSIONS);
/// ```
pub trait Embedder: Send + Sync {
    /// Returns the model name.
    fn name(&self) -> &str {
        "embedder"
    }

    /// Returns the embedding dimensions.
    fn dimensions(&self) -> usize;

    /// Generates an embedding for the given text.
    ///
    /// # Errors
    ///
    /// Returns a classified error if the service fails.
    fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>>;

    /// Generates embeddings for multiple texts.
    ///
    /// The default implementation calls `embed` for each text sequentially.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding generation fails for any text.
    fn embed_batch(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

impl<E: Embedder + ?Sized> Embedder for Arc<E> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn dimensions(&self) -> usize {
        (**self).dimensions()
    }

    fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        (**self).embed(text)
    }

    fn embed_batch(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
        (**self).embed_batch(texts)
    }
}

/// Creates the default embedder based on available features.
///
/// # Errors
///
/// Returns an error if the model cannot be loaded.
#[cfg(feature = "fastembed-embeddings")]
pub fn create_embedder() -> EmbeddingResult<SharedEmbedder> {
    Ok(Arc::new(FastEmbedEmbedder::new()?))
}

/// Creates the default embedder based on available features.
///
/// # Errors
///
/// Never fails for the hash-based embedder.
#[cfg(not(feature = "fastembed-embeddings"))]
pub fn create_embedder() -> EmbeddingResult<SharedEmbedder> {
    Ok(Arc::new(HashEmbedder::new(DEFAULT_DIMENSIONS)))
}

/// Computes cosine similarity between two embedding vectors.
///
/// Returns a value between -1.0 (opposite) and 1.0 (identical), or 0.0 if
/// the vectors have different lengths or zero magnitude.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    dot / (mag_a * mag_b)
}

/// Cosine similarity clamped to `[0, 1]`.
///
/// Opposite or unrelated directions both count as "not similar".
#[must_use]
pub fn similarity(a: &[f32], b: &[f32]) -> f32 {
    cosine_similarity(a, b).clamp(0.0, 1.0)
}
