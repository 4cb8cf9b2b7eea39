//! `FastEmbed`-based semantic embedder.
//!
//! Provides real semantic embeddings using the all-MiniLM-L6-v2 model via fastembed-rs.
//! Only available when the `fastembed-embeddings` feature is enabled.

use crate::embedding::{DEFAULT_DIMENSIONS, Embedder, EmbeddingResult};
use crate::error::EmbeddingError;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Mutex, OnceLock};

/// `FastEmbed` embedder using all-MiniLM-L6-v2.
///
/// The model is lazily loaded on the first embed call. A load failure is
/// reported as [`EmbeddingError::Unavailable`] so callers degrade instead
/// of aborting.
///
/// # Examples
///
/// ```ignore
/// use chunkbench::embedding::{Embedder, FastEmbedEmbedder};
///
/// let embedder = FastEmbedEmbedder::new()?;
/// let embedding = embedder.embed("Hello, world!")?;
/// assert_eq!(embedding.len(), 384);
/// ```
pub struct FastEmbedEmbedder {
    model_name: &'static str,
    model: OnceLock<Mutex<fastembed::TextEmbedding>>,
}

impl FastEmbedEmbedder {
    /// Creates a new `FastEmbed` embedder.
    ///
    /// # Errors
    ///
    /// Currently infallible; the model is loaded on first use.
    #[allow(clippy::unnecessary_wraps)]
    pub fn new() -> EmbeddingResult<Self> {
        Ok(Self {
            model_name: "all-MiniLM-L6-v2",
            model: OnceLock::new(),
        })
    }

    fn model(&self) -> EmbeddingResult<&Mutex<fastembed::TextEmbedding>> {
        if let Some(model) = self.model.get() {
            return Ok(model);
        }

        let options = fastembed::InitOptions::new(fastembed::EmbeddingModel::AllMiniLML6V2)
            .with_show_download_progress(false);
        let model = fastembed::TextEmbedding::try_new(options)
            .map_err(|e| EmbeddingError::Unavailable(format!("failed to load model: {e}")))?;

        // Another thread may have won the race.
        let _ = self.model.set(Mutex::new(model));
        self.model
            .get()
            .ok_or_else(|| EmbeddingError::Unavailable("model initialization race".to_string()))
    }

    /// Returns the model name.
    #[must_use]
    pub const fn model_name(&self) -> &'static str {
        self.model_name
    }

    fn run(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
        if texts.iter().any(|t| t.is_empty()) {
            return Err(EmbeddingError::InvalidInput("cannot embed empty text".to_string()));
        }

        let mut model = self
            .model()?
            .lock()
            .map_err(|e| EmbeddingError::Backend(format!("failed to lock model: {e}")))?;

        // The ONNX runtime can panic on malformed input.
        let result = catch_unwind(AssertUnwindSafe(|| model.embed(texts, None)));

        result
            .map_err(|panic_info| {
                let panic_msg = panic_info
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic_info.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                EmbeddingError::Backend(format!("ONNX runtime panic: {panic_msg}"))
            })?
            .map_err(|e| EmbeddingError::Backend(format!("embedding failed: {e}")))
    }
}

impl Embedder for FastEmbedEmbedder {
    fn name(&self) -> &str {
        self.model_name
    }

    fn dimensions(&self) -> usize {
        DEFAULT_DIMENSIONS
    }

    fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        self.run(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::Backend("no embedding returned from model".to_string()))
    }

    fn embed_batch(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.run(texts)
    }
}
