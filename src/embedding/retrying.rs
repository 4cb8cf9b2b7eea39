//! Embedder wrapper that retries transient failures.

use crate::embedding::{Embedder, EmbeddingResult};
use crate::error::{EmbeddingError, Error};
use crate::retry::RetryPolicy;

/// Wraps an embedder so timeouts, rate limits and unavailability are
/// retried with backoff before surfacing.
///
/// Once retries are exhausted the last error is returned unchanged, so
/// the semantic strategy can still degrade on it.
pub struct RetryingEmbedder<E> {
    inner: E,
    policy: RetryPolicy,
}

impl<E: Embedder> RetryingEmbedder<E> {
    /// Wraps `inner` with `policy`.
    pub const fn new(inner: E, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    /// Returns the retry policy.
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    fn retry<T>(&self, mut op: impl FnMut() -> EmbeddingResult<T>) -> EmbeddingResult<T> {
        let attempted = self.policy.run_blocking(|_| op().map_err(Error::from));
        attempted.result.map_err(|err| match err {
            Error::Embedding(inner) => inner,
            other => EmbeddingError::Backend(other.to_string()),
        })
    }
}

impl<E: Embedder> Embedder for RetryingEmbedder<E> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        self.retry(|| self.inner.embed(text))
    }

    fn embed_batch(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
        self.retry(|| self.inner.embed_batch(texts))
    }
}
