//! Per-run embedding cache.
//!
//! Metrics and the semantic strategy embed the same texts repeatedly (a
//! chunk is compared with both neighbors, every query is scored against
//! every chunk). The cache keys on the exact text and batches misses into
//! one service call.

use crate::embedding::{Embedder, EmbeddingResult};
use crate::error::EmbeddingError;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups served from the cache.
    pub hits: usize,
    /// Lookups that called the embedder.
    pub misses: usize,
}

/// Text to vector cache in front of an [`Embedder`].
#[derive(Debug, Default)]
pub struct EmbeddingCache {
    entries: HashMap<String, Arc<[f32]>>,
    stats: CacheStats,
}

impl EmbeddingCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached vectors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns hit/miss counters.
    #[must_use]
    pub const fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Returns the vector for `text`, embedding it on a miss.
    ///
    /// # Errors
    ///
    /// Propagates the embedder's error; nothing is cached on failure.
    pub fn get_or_embed(&mut self, embedder: &dyn Embedder, text: &str) -> EmbeddingResult<Arc<[f32]>> {
        if let Some(vector) = self.entries.get(text) {
            self.stats.hits += 1;
            return Ok(Arc::clone(vector));
        }
        self.stats.misses += 1;
        let vector: Arc<[f32]> = embedder.embed(text)?.into();
        self.entries.insert(text.to_string(), Arc::clone(&vector));
        Ok(vector)
    }

    /// Returns vectors for all `texts` in order, embedding the missing ones
    /// in a single batch.
    ///
    /// # Errors
    ///
    /// Propagates the embedder's error, or [`EmbeddingError::Backend`] if
    /// the batch returns the wrong number of vectors.
    pub fn embed_all(&mut self, embedder: &dyn Embedder, texts: &[&str]) -> EmbeddingResult<Vec<Arc<[f32]>>> {
        let mut missing: Vec<&str> = Vec::new();
        let mut queued: HashSet<&str> = HashSet::new();
        for text in texts {
            if self.entries.contains_key(*text) {
                self.stats.hits += 1;
            } else if queued.insert(*text) {
                missing.push(*text);
            }
        }

        if !missing.is_empty() {
            self.stats.misses += missing.len();
            let vectors = embedder.embed_batch(&missing)?;
            if vectors.len() != missing.len() {
                return Err(EmbeddingError::Backend(format!(
                    "batch returned {} vectors for {} texts",
                    vectors.len(),
                    missing.len()
                )));
            }
            for (text, vector) in missing.iter().zip(vectors) {
                self.entries.insert((*text).to_string(), vector.into());
            }
        }

        texts
            .iter()
            .map(|text| {
                self.entries
                    .get(*text)
                    .cloned()
                    .ok_or_else(|| EmbeddingError::Backend(format!("missing vector for {text:?}")))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        inner: HashEmbedder,
        calls: AtomicUsize,
    }

    impl Embedder for Counting {
        fn dimensions(&self) -> usize {
            self.inner.dimensions()
        }

        fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.embed(text)
        }
    }

    fn counting() -> Counting {
        Counting {
            inner: HashEmbedder::new(16),
            calls: AtomicUsize::new(0),
        }
    }

    #[test]
    fn test_get_or_embed_caches() {
        let embedder = counting();
        let mut cache = EmbeddingCache::new();
        let a = cache.get_or_embed(&embedder, "alpha").unwrap();
        let b = cache.get_or_embed(&embedder, "alpha").unwrap();
        assert_eq!(a, b);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1 });
    }

    #[test]
    fn test_embed_all_batches_missing_once() {
        let embedder = counting();
        let mut cache = EmbeddingCache::new();
        cache.get_or_embed(&embedder, "a").unwrap();
        let vectors = cache.embed_all(&embedder, &["a", "b", "b", "c"]).unwrap();
        assert_eq!(vectors.len(), 4);
        assert_eq!(vectors[1], vectors[2]);
        assert_eq!(cache.len(), 3);
        // "a" once up front, then "b" and "c" through the default batch.
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_embed_all_dedupes_repeated_misses() {
        let embedder = counting();
        let mut cache = EmbeddingCache::new();
        let texts: Vec<String> = (0..500).map(|i| format!("sentence {}", i % 25)).collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();

        let vectors = cache.embed_all(&embedder, &refs).unwrap();
        assert_eq!(vectors.len(), 500);
        assert_eq!(vectors[0], vectors[25]);
        assert_eq!(cache.len(), 25);
        assert_eq!(cache.stats(), CacheStats { hits: 0, misses: 25 });
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 25);
    }

    #[test]
    fn test_failure_not_cached() {
        struct Failing;
        impl Embedder for Failing {
            fn dimensions(&self) -> usize {
                4
            }
            fn embed(&self, _text: &str) -> EmbeddingResult<Vec<f32>> {
                Err(EmbeddingError::Timeout { after_ms: 5 })
            }
        }

        let mut cache = EmbeddingCache::new();
        assert!(cache.get_or_embed(&Failing, "x").is_err());
        assert!(cache.embed_all(&Failing, &["x", "y"]).is_err());
        assert!(cache.is_empty());
    }
}
