//! Strategy configuration and validation.

use crate::chunking::Strategy;
use crate::error::ChunkingError;
use serde::{Deserialize, Serialize};

/// Default token budget per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 512;

/// Default overlap in tokens.
pub const DEFAULT_OVERLAP: usize = 0;

/// Maximum allowed token budget.
pub const MAX_CHUNK_SIZE: usize = 250_000;

/// Default similarity below which the semantic strategy cuts.
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.5;

/// Default heading level that forces a boundary in the hierarchy strategy.
pub const DEFAULT_HEADING_LEVEL: u8 = 2;

/// Default number of sentences joined on each side of a semantic gap.
pub const DEFAULT_SEMANTIC_WINDOW: usize = 1;

/// Structural granularity at which a splitter may cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryPolicy {
    /// Cut anywhere (token offsets).
    None,
    /// Cut between sentences.
    Sentence,
    /// Cut between paragraphs.
    #[default]
    Paragraph,
    /// Cut between structural nodes.
    Structural,
}

impl BoundaryPolicy {
    /// Returns the strategy that implements this policy.
    #[must_use]
    pub const fn default_strategy(self, overlap: usize) -> Strategy {
        match self {
            Self::None if overlap > 0 => Strategy::Overlap,
            Self::None => Strategy::Fixed,
            Self::Sentence => Strategy::Sentence,
            Self::Paragraph => Strategy::Paragraph,
            Self::Structural => Strategy::Hierarchy,
        }
    }
}

/// Configuration for a chunking run.
///
/// # Examples
///
/// ```
/// use chunkbench::chunking::{BoundaryPolicy, Strategy, StrategyConfig};
///
/// let config = StrategyConfig::new(256)
///     .with_overlap(32)
///     .boundary_policy(BoundaryPolicy::Sentence);
/// assert!(config.validate().is_ok());
/// assert_eq!(config.resolve_strategy(), Strategy::Sentence);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Explicit strategy; derived from `boundary_policy` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<Strategy>,
    /// Token budget per chunk.
    pub chunk_size: usize,
    /// Tokens shared between consecutive chunks.
    pub overlap: usize,
    /// Granularity at which cuts are allowed.
    pub boundary_policy: BoundaryPolicy,
    /// Similarity below which the semantic strategy cuts (0 to 1).
    pub similarity_threshold: f32,
    /// Headings at or above this level open a new chunk.
    pub heading_level: u8,
    /// Sentences joined on each side of a semantic gap.
    pub semantic_window: usize,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl StrategyConfig {
    /// Creates a configuration with the given budget and defaults elsewhere.
    #[must_use]
    pub const fn new(chunk_size: usize) -> Self {
        Self {
            strategy: None,
            chunk_size,
            overlap: DEFAULT_OVERLAP,
            boundary_policy: BoundaryPolicy::Paragraph,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            heading_level: DEFAULT_HEADING_LEVEL,
            semantic_window: DEFAULT_SEMANTIC_WINDOW,
        }
    }

    /// Creates a configuration for an explicit strategy.
    #[must_use]
    pub const fn for_strategy(strategy: Strategy, chunk_size: usize) -> Self {
        let mut config = Self::new(chunk_size);
        config.strategy = Some(strategy);
        config
    }

    /// Sets the overlap.
    #[must_use]
    pub const fn with_overlap(mut self, overlap: usize) -> Self {
        self.overlap = overlap;
        self
    }

    /// Sets the strategy explicitly.
    #[must_use]
    pub const fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Sets the boundary policy.
    #[must_use]
    pub const fn boundary_policy(mut self, policy: BoundaryPolicy) -> Self {
        self.boundary_policy = policy;
        self
    }

    /// Sets the semantic similarity threshold.
    #[must_use]
    pub const fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    /// Sets the heading level that forces a boundary.
    #[must_use]
    pub const fn heading_level(mut self, level: u8) -> Self {
        self.heading_level = level;
        self
    }

    /// Sets the semantic window.
    #[must_use]
    pub const fn semantic_window(mut self, window: usize) -> Self {
        self.semantic_window = window;
        self
    }

    /// Returns the strategy this configuration selects.
    #[must_use]
    pub const fn resolve_strategy(&self) -> Strategy {
        match self.strategy {
            Some(strategy) => strategy,
            None => self.boundary_policy.default_strategy(self.overlap),
        }
    }

    /// Validates the configuration for the strategy it selects.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if chunk size is zero or above
    /// [`MAX_CHUNK_SIZE`], overlap is not below chunk size, the overlap
    /// strategy has no overlap, or a semantic/hierarchy parameter is out of
    /// range.
    pub fn validate(&self) -> Result<(), ChunkingError> {
        if self.chunk_size == 0 {
            return Err(ChunkingError::InvalidConfig {
                reason: "chunk_size must be > 0".to_string(),
            });
        }
        if self.chunk_size > MAX_CHUNK_SIZE {
            return Err(ChunkingError::ChunkTooLarge {
                size: self.chunk_size,
                max: MAX_CHUNK_SIZE,
            });
        }
        if self.overlap >= self.chunk_size {
            return Err(ChunkingError::OverlapTooLarge {
                overlap: self.overlap,
                size: self.chunk_size,
            });
        }

        match self.resolve_strategy() {
            Strategy::Overlap if self.overlap == 0 => Err(ChunkingError::InvalidConfig {
                reason: "overlap strategy requires overlap > 0".to_string(),
            }),
            Strategy::Semantic if !(0.0..=1.0).contains(&self.similarity_threshold) => {
                Err(ChunkingError::InvalidConfig {
                    reason: format!(
                        "similarity_threshold must be within [0, 1], got {}",
                        self.similarity_threshold
                    ),
                })
            }
            Strategy::Semantic if self.semantic_window == 0 => Err(ChunkingError::InvalidConfig {
                reason: "semantic_window must be > 0".to_string(),
            }),
            Strategy::Hierarchy if !(1..=6).contains(&self.heading_level) => {
                Err(ChunkingError::InvalidConfig {
                    reason: format!("heading_level must be 1-6, got {}", self.heading_level),
                })
            }
            _ => Ok(()),
        }
    }
}
