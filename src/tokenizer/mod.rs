//! Tokenizer adapters.
//!
//! Token budgets are expressed in tokens of whatever tokenizer the caller
//! configures. Strategies only rely on the [`Tokenizer`] trait: counting,
//! encoding, and token byte spans for cutting at token offsets.
//!
//! Three deterministic implementations are provided:
//!
//! - [`CharTokenizer`]: one token per Unicode scalar value
//! - [`WordTokenizer`]: Unicode word boundaries, punctuation as tokens
//! - [`HeuristicTokenizer`]: roughly four characters per token, the usual
//!   estimate for subword tokenizers

use crate::error::ChunkingError;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::ops::Range;
use std::sync::Arc;
use unicode_segmentation::UnicodeSegmentation;

/// Shared, thread-safe tokenizer handle.
pub type SharedTokenizer = Arc<dyn Tokenizer>;

/// Default characters per token for [`HeuristicTokenizer`].
pub const DEFAULT_CHARS_PER_TOKEN: usize = 4;

/// Counts and encodes tokens.
///
/// Implementations must be stateless and deterministic: the same text
/// always yields the same spans.
pub trait Tokenizer: Send + Sync {
    /// Returns the tokenizer name.
    fn name(&self) -> &'static str;

    /// Returns the byte span of every token in `text`, in order.
    fn token_spans(&self, text: &str) -> Vec<Range<usize>>;

    /// Counts tokens in `text`.
    fn count_tokens(&self, text: &str) -> usize {
        self.token_spans(text).len()
    }

    /// Counts tokens that are not pure whitespace.
    fn count_content_tokens(&self, text: &str) -> usize {
        self.token_spans(text)
            .into_iter()
            .filter(|span| !text[span.clone()].trim().is_empty())
            .count()
    }

    /// Encodes `text` into token ids.
    fn encode(&self, text: &str) -> Vec<u32> {
        self.token_spans(text)
            .into_iter()
            .map(|span| token_id(&text[span]))
            .collect()
    }
}

/// Hashes a token into a stable 32-bit id.
#[allow(clippy::cast_possible_truncation)]
fn token_id(token: &str) -> u32 {
    let mut hasher = DefaultHasher::new();
    token.hash(&mut hasher);
    hasher.finish() as u32
}

/// One token per character.
///
/// # Examples
///
/// ```
/// use chunkbench::tokenizer::{CharTokenizer, Tokenizer};
///
/// let tokenizer = CharTokenizer;
/// assert_eq!(tokenizer.count_tokens("héllo"), 5);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct CharTokenizer;

impl Tokenizer for CharTokenizer {
    fn name(&self) -> &'static str {
        "char"
    }

    fn token_spans(&self, text: &str) -> Vec<Range<usize>> {
        text.char_indices()
            .map(|(i, c)| i..i + c.len_utf8())
            .collect()
    }

    fn count_tokens(&self, text: &str) -> usize {
        text.chars().count()
    }

    fn count_content_tokens(&self, text: &str) -> usize {
        text.chars().filter(|c| !c.is_whitespace()).count()
    }

    fn encode(&self, text: &str) -> Vec<u32> {
        text.chars().map(u32::from).collect()
    }
}

/// Words and punctuation marks per Unicode word boundaries.
///
/// Whitespace is not a token.
///
/// # Examples
///
/// ```
/// use chunkbench::tokenizer::{Tokenizer, WordTokenizer};
///
/// let tokenizer = WordTokenizer;
/// assert_eq!(tokenizer.count_tokens("Hello, world!"), 4);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct WordTokenizer;

impl Tokenizer for WordTokenizer {
    fn name(&self) -> &'static str {
        "word"
    }

    fn token_spans(&self, text: &str) -> Vec<Range<usize>> {
        text.split_word_bound_indices()
            .filter(|(_, segment)| !segment.trim().is_empty())
            .map(|(i, segment)| i..i + segment.len())
            .collect()
    }

    fn count_content_tokens(&self, text: &str) -> usize {
        self.count_tokens(text)
    }
}

/// Approximates subword tokenization: each word is cut into pieces of at
/// most `chars_per_token` characters.
///
/// # Examples
///
/// ```
/// use chunkbench::tokenizer::{HeuristicTokenizer, Tokenizer};
///
/// let tokenizer = HeuristicTokenizer::new();
/// // "tokenization" (12 chars) -> 3 tokens, "!" -> 1 token
/// assert_eq!(tokenizer.count_tokens("tokenization!"), 4);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct HeuristicTokenizer {
    chars_per_token: usize,
}

impl HeuristicTokenizer {
    /// Creates a tokenizer with the default ratio.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            chars_per_token: DEFAULT_CHARS_PER_TOKEN,
        }
    }

    /// Sets the characters per token (at least 1).
    #[must_use]
    pub const fn chars_per_token(mut self, chars: usize) -> Self {
        self.chars_per_token = if chars == 0 { 1 } else { chars };
        self
    }
}

impl Default for HeuristicTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer for HeuristicTokenizer {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    fn token_spans(&self, text: &str) -> Vec<Range<usize>> {
        let mut spans = Vec::new();
        for (offset, segment) in text.split_word_bound_indices() {
            if segment.trim().is_empty() {
                continue;
            }
            let mut piece_start = offset;
            for (n, (i, _)) in segment.char_indices().enumerate() {
                if n > 0 && n % self.chars_per_token == 0 {
                    spans.push(piece_start..offset + i);
                    piece_start = offset + i;
                }
            }
            spans.push(piece_start..offset + segment.len());
        }
        spans
    }

    fn count_content_tokens(&self, text: &str) -> usize {
        self.count_tokens(text)
    }
}

/// Creates a tokenizer by name.
///
/// # Arguments
///
/// * `name` - Tokenizer name: "char", "word", or "heuristic" (with aliases).
///
/// # Errors
///
/// Returns an error if the tokenizer name is not recognized.
pub fn create_tokenizer(name: &str) -> Result<SharedTokenizer, ChunkingError> {
    match name.to_lowercase().as_str() {
        "char" | "chars" | "character" => Ok(Arc::new(CharTokenizer)),
        "word" | "words" | "whitespace" => Ok(Arc::new(WordTokenizer)),
        "heuristic" | "estimate" | "subword" => Ok(Arc::new(HeuristicTokenizer::new())),
        _ => Err(ChunkingError::InvalidConfig {
            reason: format!("unknown tokenizer: {name}"),
        }),
    }
}

/// Lists available tokenizer names.
#[must_use]
pub const fn available_tokenizers() -> &'static [&'static str] {
    &["char", "word", "heuristic"]
}
