//! Chunking strategies.
//!
//! Every strategy turns a [`Document`] into an ordered [`ChunkSet`] under a
//! token budget. Strategies form a closed set:
//!
//! - **Fixed**: cut every `chunk_size - overlap` tokens, ignoring structure
//! - **Overlap**: fixed-size windows that share `overlap` tokens
//! - **Sentence**: whole sentences packed up to the budget
//! - **Paragraph**: whole paragraphs, oversized ones replaced by sentences
//! - **Hierarchy**: depth-first over the structural tree, tables atomic
//! - **Semantic**: cut where adjacent sentences stop being similar
//! - **Recursive**: separator cascade down to token windows
//!
//! Shared guarantees: chunks are ordered by source position, no chunk is
//! empty, and a chunk exceeds the budget only when flagged
//! [`ChunkFlag::OversizedAtomicUnit`](crate::core::ChunkFlag::OversizedAtomicUnit).

mod annotate;
pub mod config;
pub mod fixed;
pub mod hierarchy;
pub mod pack;
pub mod paragraph;
pub mod recursive;
pub mod semantic;
pub mod sentence;

pub use config::{
    BoundaryPolicy, DEFAULT_CHUNK_SIZE, DEFAULT_HEADING_LEVEL, DEFAULT_OVERLAP,
    DEFAULT_SEMANTIC_WINDOW, DEFAULT_SIMILARITY_THRESHOLD, MAX_CHUNK_SIZE, StrategyConfig,
};
pub use semantic::SemanticSplit;

use crate::core::{ChunkSet, Document};
use crate::embedding::Embedder;
use crate::error::{ChunkingError, Result};
use crate::tokenizer::Tokenizer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// A chunking strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Token windows, no overlap.
    Fixed,
    /// Token windows sharing `overlap` tokens.
    Overlap,
    /// Sentence-aware packing.
    Sentence,
    /// Paragraph-aware packing.
    Paragraph,
    /// Structural tree walk.
    Hierarchy,
    /// Embedding similarity boundaries.
    Semantic,
    /// Separator cascade.
    Recursive,
}

impl Strategy {
    /// All strategies in declaration order.
    pub const ALL: [Self; 7] = [
        Self::Fixed,
        Self::Overlap,
        Self::Sentence,
        Self::Paragraph,
        Self::Hierarchy,
        Self::Semantic,
        Self::Recursive,
    ];

    /// Returns the strategy name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::Overlap => "overlap",
            Self::Sentence => "sentence",
            Self::Paragraph => "paragraph",
            Self::Hierarchy => "hierarchy",
            Self::Semantic => "semantic",
            Self::Recursive => "recursive",
        }
    }

    /// Returns a one-line description.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Fixed => "fixed token windows; structure ignored",
            Self::Overlap => "fixed token windows sharing trailing tokens",
            Self::Sentence => "whole sentences packed up to the budget",
            Self::Paragraph => "whole paragraphs, falling back to sentences",
            Self::Hierarchy => "structural tree walk with atomic tables and code",
            Self::Semantic => "boundaries at low embedding similarity",
            Self::Recursive => "paragraph, sentence, clause, word, token cascade",
        }
    }

    /// Looks up a strategy by name.
    ///
    /// # Arguments
    ///
    /// * `name` - Strategy name, case insensitive; common aliases accepted.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkingError::UnknownStrategy`] if the name is not recognized.
    pub fn from_name(name: &str) -> std::result::Result<Self, ChunkingError> {
        match name.trim().to_lowercase().as_str() {
            "fixed" | "fixed_size" | "fixed-size" | "token" => Ok(Self::Fixed),
            "overlap" | "sliding" | "sliding_window" => Ok(Self::Overlap),
            "sentence" | "sentences" => Ok(Self::Sentence),
            "paragraph" | "paragraphs" => Ok(Self::Paragraph),
            "hierarchy" | "hierarchical" | "structural" => Ok(Self::Hierarchy),
            "semantic" | "embedding" => Ok(Self::Semantic),
            "recursive" | "cascade" => Ok(Self::Recursive),
            _ => Err(ChunkingError::UnknownStrategy {
                name: name.to_string(),
            }),
        }
    }

    /// Splits `document` with this strategy, overriding any strategy set
    /// in `config`.
    ///
    /// # Errors
    ///
    /// See [`split`].
    pub fn split(
        self,
        document: &Document,
        config: &StrategyConfig,
        ctx: &SplitContext<'_>,
    ) -> Result<ChunkSet> {
        split(document, &config.clone().with_strategy(self), ctx)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = ChunkingError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

/// Collaborators a split needs besides the document and configuration.
#[derive(Clone, Copy)]
pub struct SplitContext<'a> {
    /// Counts and locates tokens.
    pub tokenizer: &'a dyn Tokenizer,
    /// Embedding service for the semantic strategy.
    pub embedder: Option<&'a dyn Embedder>,
}

impl<'a> SplitContext<'a> {
    /// Creates a context without an embedder.
    #[must_use]
    pub fn new(tokenizer: &'a dyn Tokenizer) -> Self {
        Self {
            tokenizer,
            embedder: None,
        }
    }

    /// Sets the embedder.
    #[must_use]
    pub fn with_embedder(mut self, embedder: &'a dyn Embedder) -> Self {
        self.embedder = Some(embedder);
        self
    }
}

/// Splits `document` into chunks.
///
/// The configuration is validated first; the strategy comes from
/// [`StrategyConfig::resolve_strategy`]. Chunks are numbered in order,
/// linked to the structural nodes they overlap, hashed, and annotated with
/// their section path, list and code markers, and word count.
///
/// # Examples
///
/// ```
/// use chunkbench::chunking::{split, SplitContext, Strategy, StrategyConfig};
/// use chunkbench::core::Document;
/// use chunkbench::tokenizer::WordTokenizer;
///
/// let doc = Document::from_text("doc", "One. Two. Three.");
/// let config = StrategyConfig::for_strategy(Strategy::Sentence, 4);
/// let set = split(&doc, &config, &SplitContext::new(&WordTokenizer)).unwrap();
/// assert_eq!(set.len(), 2);
/// assert_eq!(set.chunks[1].index, 1);
/// ```
///
/// # Errors
///
/// Returns a configuration error if `config` is invalid, or a parse
/// failure if the document's structural spans do not fit its text.
pub fn split(document: &Document, config: &StrategyConfig, ctx: &SplitContext<'_>) -> Result<ChunkSet> {
    config.validate()?;

    let strategy = config.resolve_strategy();
    let label = strategy.name();
    let text = document.text.as_str();
    let tokenizer = ctx.tokenizer;
    let mut set = ChunkSet::new(document.id.clone(), label, config.chunk_size);

    let chunks = match strategy {
        Strategy::Fixed | Strategy::Overlap => fixed::split(text, config, tokenizer, label),
        Strategy::Sentence => sentence::split(text, config, tokenizer, label),
        Strategy::Paragraph => paragraph::split(text, config, tokenizer, label),
        Strategy::Hierarchy => hierarchy::split(document, config, tokenizer, label)?,
        Strategy::Semantic => {
            let out = semantic::split(text, config, tokenizer, ctx.embedder, label);
            set.degradations.extend(out.degradation);
            out.chunks
        }
        Strategy::Recursive => recursive::split(text, config, tokenizer, label),
    };

    set.chunks = chunks;
    for (index, chunk) in set.chunks.iter_mut().enumerate() {
        chunk.index = index;
        if !document.is_flat() {
            chunk.node_refs = document.nodes_intersecting(&chunk.byte_range);
        }
        chunk.compute_hash();
    }
    annotate::annotate(document, &mut set);

    debug!(
        document = %document.id,
        strategy = label,
        tokenizer = tokenizer.name(),
        chunks = set.len(),
        oversized = set.oversized_count(),
        degraded = set.is_degraded(),
        "split document"
    );

    Ok(set)
}

/// Lists available chunking strategy names.
#[must_use]
pub fn available_strategies() -> Vec<&'static str> {
    Strategy::ALL.iter().map(|s| s.name()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DocumentFormat, StructuralNode};
    use crate::embedding::HashEmbedder;
    use crate::error::{Error, ErrorKind};
    use crate::tokenizer::{CharTokenizer, WordTokenizer};
    use test_case::test_case;

    #[test_case("fixed", Strategy::Fixed ; "fixed")]
    #[test_case("FIXED", Strategy::Fixed ; "case insensitive")]
    #[test_case("sliding_window", Strategy::Overlap ; "overlap alias")]
    #[test_case("hierarchical", Strategy::Hierarchy ; "hierarchy alias")]
    #[test_case(" semantic ", Strategy::Semantic ; "trimmed")]
    #[test_case("cascade", Strategy::Recursive ; "recursive alias")]
    fn test_from_name(name: &str, expected: Strategy) {
        assert_eq!(Strategy::from_name(name).unwrap(), expected);
    }

    #[test]
    fn test_from_name_unknown() {
        let err = Strategy::from_name("magic").unwrap_err();
        assert_eq!(err.to_string(), "unknown chunking strategy: magic");
    }

    #[test]
    fn test_name_roundtrip() {
        for strategy in Strategy::ALL {
            assert_eq!(strategy.name().parse::<Strategy>().unwrap(), strategy);
            assert!(!strategy.description().is_empty());
        }
    }

    #[test]
    fn test_available_strategies() {
        let strategies = available_strategies();
        assert_eq!(strategies.len(), 7);
        assert!(strategies.contains(&"recursive"));
    }

    #[test]
    fn test_split_numbers_and_hashes_chunks() {
        let doc = Document::from_text("doc", "abcdefghij");
        let config = StrategyConfig::for_strategy(Strategy::Fixed, 4);
        let set = split(&doc, &config, &SplitContext::new(&CharTokenizer)).unwrap();
        assert_eq!(set.strategy, "fixed");
        assert_eq!(set.document_id, "doc");
        assert_eq!(set.budget, 4);
        let indices: Vec<_> = set.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert!(set.iter().all(|c| c.metadata.content_hash.is_some()));
        assert!(set.iter().all(|c| c.strategy() == Some("fixed")));
    }

    #[test]
    fn test_split_rejects_invalid_config() {
        let doc = Document::from_text("doc", "text");
        let config = StrategyConfig::new(10).with_overlap(10);
        let err = split(&doc, &config, &SplitContext::new(&CharTokenizer)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigurationInvalid);
    }

    #[test]
    fn test_split_attaches_node_refs() {
        let text = "# Head\n\nBody text.";
        let doc = Document::with_nodes(
            "doc",
            text,
            DocumentFormat::Markdown,
            vec![StructuralNode::heading(1, 0..text.len())
                .with_children(vec![StructuralNode::paragraph(8..text.len())])],
        );
        let config = StrategyConfig::for_strategy(Strategy::Hierarchy, 100);
        let set = split(&doc, &config, &SplitContext::new(&CharTokenizer)).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.chunks[0].node_refs, vec![0, 1]);
    }

    #[test]
    fn test_semantic_without_embedder_records_degradation() {
        let doc = Document::from_text("doc", "One.\n\nTwo.");
        let config = StrategyConfig::for_strategy(Strategy::Semantic, 10);
        let set = split(&doc, &config, &SplitContext::new(&WordTokenizer)).unwrap();
        assert_eq!(set.strategy, "semantic");
        assert!(set.is_degraded());
        assert_eq!(set.degradations[0].to, "paragraph");
    }

    #[test]
    fn test_semantic_with_embedder() {
        let embedder = HashEmbedder::default();
        let doc = Document::from_text("doc", "One two. Three four.");
        let config = StrategyConfig::for_strategy(Strategy::Semantic, 100);
        let ctx = SplitContext::new(&WordTokenizer).with_embedder(&embedder);
        let set = split(&doc, &config, &ctx).unwrap();
        assert!(!set.is_degraded());
        assert!(!set.is_empty());
    }

    #[test]
    fn test_strategy_split_overrides_config() {
        let doc = Document::from_text("doc", "A. B. C.");
        let config = StrategyConfig::new(2);
        let set = Strategy::Sentence
            .split(&doc, &config, &SplitContext::new(&CharTokenizer))
            .unwrap();
        assert_eq!(set.strategy, "sentence");
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_hierarchy_invalid_span_is_parse_failure() {
        let doc = Document::with_nodes(
            "bad",
            "tiny",
            DocumentFormat::Markdown,
            vec![StructuralNode::paragraph(0..50)],
        );
        let config = StrategyConfig::for_strategy(Strategy::Hierarchy, 10);
        let err = split(&doc, &config, &SplitContext::new(&CharTokenizer)).unwrap_err();
        assert!(matches!(err, Error::Chunking(ChunkingError::InvalidSpan { .. })));
        assert_eq!(err.kind(), ErrorKind::ParseFailure);
    }

    #[test]
    fn test_hierarchy_reversed_siblings_is_parse_failure() {
        let doc = Document::with_nodes(
            "bad",
            "abcd efgh",
            DocumentFormat::Markdown,
            vec![StructuralNode::paragraph(5..9), StructuralNode::paragraph(0..4)],
        );
        let config = StrategyConfig::for_strategy(Strategy::Hierarchy, 100);
        let err = split(&doc, &config, &SplitContext::new(&CharTokenizer)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseFailure);
    }

    #[test]
    fn test_split_annotates_sections_and_lists() {
        let text = "# Guide\n\n## Install\n\nRun the installer.\n\n- one\n- two";
        let doc = Document::from_text("doc", text);
        let config = StrategyConfig::for_strategy(Strategy::Paragraph, 20);
        let set = split(&doc, &config, &SplitContext::new(&CharTokenizer)).unwrap();

        assert!(set.len() > 1);
        for chunk in &set {
            assert_eq!(chunk.metadata.total_chunks, set.len());
            assert_eq!(chunk.metadata.word_count, chunk.content.split_whitespace().count());
        }
        let run = set.iter().find(|c| c.content.starts_with("Run")).unwrap();
        assert_eq!(run.metadata.section_path, vec!["Guide", "Install"]);
        assert!(!run.metadata.has_list);
        let last = set.chunks.last().unwrap();
        assert!(last.metadata.has_list);
        assert!(!last.metadata.has_code);
    }

    #[test]
    fn test_strategy_serde_snake_case() {
        let json = serde_json::to_string(&Strategy::Hierarchy).unwrap();
        assert_eq!(json, "\"hierarchy\"");
    }
}
