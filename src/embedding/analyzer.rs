//! Similarity queries over an embedder.

use crate::embedding::{EmbeddingCache, Embedder, EmbeddingResult, similarity};

/// Computes similarities between texts, caching vectors per run.
///
/// # Examples
///
/// ```
/// use chunkbench::embedding::{EmbeddingAnalyzer, EmbeddingCache, HashEmbedder};
///
/// let embedder = HashEmbedder::default();
/// let analyzer = EmbeddingAnalyzer::new(&embedder);
/// let mut cache = EmbeddingCache::new();
/// let sim = analyzer.similarity("same text", "same text", &mut cache).unwrap();
/// assert!((sim - 1.0).abs() < 1e-5);
/// ```
pub struct EmbeddingAnalyzer<'a> {
    embedder: &'a dyn Embedder,
    window: usize,
}

impl<'a> EmbeddingAnalyzer<'a> {
    /// Creates an analyzer comparing single sentences across each gap.
    #[must_use]
    pub fn new(embedder: &'a dyn Embedder) -> Self {
        Self { embedder, window: 1 }
    }

    /// Sets how many sentences are joined on each side of a gap.
    #[must_use]
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window.max(1);
        self
    }

    /// Returns the underlying embedder.
    #[must_use]
    pub fn embedder(&self) -> &'a dyn Embedder {
        self.embedder
    }

    /// Similarity of two texts in `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Propagates embedding failures.
    pub fn similarity(&self, a: &str, b: &str, cache: &mut EmbeddingCache) -> EmbeddingResult<f32> {
        let vectors = cache.embed_all(self.embedder, &[a, b])?;
        Ok(similarity(&vectors[0], &vectors[1]))
    }

    /// Similarity across each of the `n - 1` gaps between consecutive
    /// `segments`.
    ///
    /// Gap `i` compares the window ending at segment `i` with the window
    /// starting at segment `i + 1`.
    ///
    /// # Errors
    ///
    /// Propagates embedding failures.
    pub fn windowed_similarities(
        &self,
        segments: &[&str],
        cache: &mut EmbeddingCache,
    ) -> EmbeddingResult<Vec<f32>> {
        if segments.len() < 2 {
            return Ok(Vec::new());
        }

        let gaps = segments.len() - 1;
        let mut left = Vec::with_capacity(gaps);
        let mut right = Vec::with_capacity(gaps);
        for i in 0..gaps {
            let lo = (i + 1).saturating_sub(self.window);
            let hi = (i + 1 + self.window).min(segments.len());
            left.push(segments[lo..=i].join(" "));
            right.push(segments[i + 1..hi].join(" "));
        }

        let texts: Vec<&str> = left
            .iter()
            .chain(right.iter())
            .map(String::as_str)
            .collect();
        let vectors = cache.embed_all(self.embedder, &texts)?;

        Ok((0..gaps)
            .map(|i| similarity(&vectors[i], &vectors[gaps + i]))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;

    #[test]
    fn test_windowed_similarities_len() {
        let embedder = HashEmbedder::default();
        let analyzer = EmbeddingAnalyzer::new(&embedder);
        let mut cache = EmbeddingCache::new();
        let sims = analyzer
            .windowed_similarities(&["a b", "c d", "e f", "g h"], &mut cache)
            .unwrap();
        assert_eq!(sims.len(), 3);
        assert!(sims.iter().all(|s| (0.0..=1.0).contains(s)));
    }

    #[test]
    fn test_single_segment_has_no_gaps() {
        let embedder = HashEmbedder::default();
        let analyzer = EmbeddingAnalyzer::new(&embedder).with_window(2);
        let mut cache = EmbeddingCache::new();
        assert!(analyzer.windowed_similarities(&["only"], &mut cache).unwrap().is_empty());
    }

    #[test]
    fn test_topic_shift_scores_lower() {
        let embedder = HashEmbedder::default();
        let analyzer = EmbeddingAnalyzer::new(&embedder);
        let mut cache = EmbeddingCache::new();
        let sims = analyzer
            .windowed_similarities(
                &[
                    "cats purr and cats sleep",
                    "cats sleep and cats purr loudly",
                    "stock markets fell sharply today",
                ],
                &mut cache,
            )
            .unwrap();
        assert!(sims[0] > sims[1]);
    }

    #[test]
    fn test_window_zero_clamped() {
        let embedder = HashEmbedder::default();
        let analyzer = EmbeddingAnalyzer::new(&embedder).with_window(0);
        let mut cache = EmbeddingCache::new();
        let sims = analyzer.windowed_similarities(&["x", "y"], &mut cache).unwrap();
        assert_eq!(sims.len(), 1);
    }
}
