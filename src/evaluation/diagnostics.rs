//! Chunk-quality diagnostics.
//!
//! Flags the damage naive chunking typically does: chunks that start in
//! the middle of a sentence, chunks that refer to context that may now
//! live elsewhere, and list items cut off from the line introducing them.

use crate::core::Chunk;
use crate::text::{find_char_boundary, find_char_boundary_forward};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Bytes of chunk text shown in a problem example.
const EXAMPLE_LEN: usize = 50;

/// Bytes of context shown on each side of a reference phrase.
const CONTEXT_LEN: usize = 30;

/// Phrases that point at context outside the chunk.
pub const DEFAULT_REFERENCE_PHRASES: [&str; 5] = [
    "as mentioned above",
    "see table",
    "following the previous",
    "as described earlier",
    "refer to section",
];

/// Category of a chunking problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemKind {
    /// The chunk starts mid-sentence.
    SemanticBreak,
    /// The chunk refers to context that may be in another chunk.
    ReferenceLoss,
    /// A list item is separated from its lead-in.
    StructuralDestruction,
}

/// A problem found in a chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkProblem {
    /// Index of the affected chunk.
    pub chunk_index: usize,
    /// Problem category.
    pub kind: ProblemKind,
    /// Human-readable description.
    pub description: String,
    /// Excerpt showing the problem.
    pub example: String,
}

/// Finds problems in a sequence of chunks.
#[derive(Debug, Clone)]
pub struct ChunkAnalyzer {
    reference_phrases: Vec<String>,
}

impl Default for ChunkAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkAnalyzer {
    /// Creates an analyzer with the default reference phrases.
    #[must_use]
    pub fn new() -> Self {
        Self {
            reference_phrases: DEFAULT_REFERENCE_PHRASES.iter().map(|p| (*p).to_string()).collect(),
        }
    }

    /// Replaces the reference phrases (matched case-insensitively).
    #[must_use]
    pub fn with_reference_phrases(mut self, phrases: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.reference_phrases = phrases
            .into_iter()
            .map(|p| p.into().to_ascii_lowercase())
            .collect();
        self
    }

    #[allow(clippy::expect_used)]
    fn list_item_regex() -> &'static Regex {
        static LIST_ITEM: OnceLock<Regex> = OnceLock::new();
        LIST_ITEM.get_or_init(|| Regex::new(r"^(?:[-*•]|\d+[.)])\s").expect("valid regex"))
    }

    /// Analyzes `chunks` in order.
    ///
    /// # Examples
    ///
    /// ```
    /// use chunkbench::core::Chunk;
    /// use chunkbench::evaluation::{ChunkAnalyzer, ProblemKind};
    ///
    /// let chunks = vec![
    ///     Chunk::new(0, "The dosage is 50mg tw".to_string(), 0..21, 21),
    ///     Chunk::new(1, "ice daily.".to_string(), 21..31, 10),
    /// ];
    /// let problems = ChunkAnalyzer::new().analyze(&chunks);
    /// assert_eq!(problems.len(), 1);
    /// assert_eq!(problems[0].kind, ProblemKind::SemanticBreak);
    /// ```
    #[must_use]
    pub fn analyze(&self, chunks: &[Chunk]) -> Vec<ChunkProblem> {
        let mut problems = Vec::new();

        for (i, chunk) in chunks.iter().enumerate() {
            let previous = i.checked_sub(1).map(|p| chunks[p].content.trim_end());

            if previous.is_some_and(|prev| !prev.ends_with(['.', '!', '?'])) {
                problems.push(ChunkProblem {
                    chunk_index: chunk.index,
                    kind: ProblemKind::SemanticBreak,
                    description: "chunk starts mid-sentence".to_string(),
                    example: excerpt(&chunk.content),
                });
            }

            let lowered = chunk.content.to_ascii_lowercase();
            for phrase in &self.reference_phrases {
                if let Some(at) = lowered.find(phrase.as_str()) {
                    problems.push(ChunkProblem {
                        chunk_index: chunk.index,
                        kind: ProblemKind::ReferenceLoss,
                        description: format!(
                            "contains reference '{phrase}' but context may be in a different chunk"
                        ),
                        example: context(&chunk.content, at, phrase.len()),
                    });
                }
            }

            let starts_list = Self::list_item_regex().is_match(chunk.content.trim_start());
            if starts_list && !previous.is_some_and(|prev| prev.ends_with(':')) {
                problems.push(ChunkProblem {
                    chunk_index: chunk.index,
                    kind: ProblemKind::StructuralDestruction,
                    description: "list item separated from its lead-in".to_string(),
                    example: excerpt(&chunk.content),
                });
            }
        }

        problems
    }
}

fn excerpt(content: &str) -> String {
    let end = find_char_boundary(content, EXAMPLE_LEN.min(content.len()));
    format!("{}...", &content[..end])
}

fn context(content: &str, at: usize, len: usize) -> String {
    let start = find_char_boundary(content, at.saturating_sub(CONTEXT_LEN));
    let end = find_char_boundary_forward(content, (at + len + CONTEXT_LEN).min(content.len()));
    format!("...{}...", &content[start..end])
}
