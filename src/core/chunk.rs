//! Chunk representation.
//!
//! Chunks are bounded segments of a document produced by a chunking
//! strategy. Each chunk keeps its byte span in the source text, its token
//! count as reported by the tokenizer, and the structural nodes it was
//! derived from.

use crate::core::document::NodeId;
use crate::error::ErrorKind;
use crate::text::find_char_boundary;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Represents a chunk of text from a document.
///
/// # Examples
///
/// ```
/// use chunkbench::core::Chunk;
///
/// let chunk = Chunk::new(0, "Hello, world!".to_string(), 0..13, 4);
/// assert_eq!(chunk.size(), 13);
/// assert!(!chunk.is_oversized());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Sequential index within the chunk set (0-based).
    pub index: usize,

    /// Chunk content, sliced from the source text.
    pub content: String,

    /// Byte range in the source text.
    pub byte_range: Range<usize>,

    /// Token count as reported by the tokenizer.
    pub token_count: usize,

    /// Structural nodes this chunk was derived from.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub node_refs: Vec<NodeId>,

    /// Chunk metadata.
    pub metadata: ChunkMetadata,
}

/// Metadata associated with a chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Chunking strategy that created this chunk.
    pub strategy: Option<String>,

    /// Byte range shared with the previous chunk.
    pub overlap_prev: Option<Range<usize>>,

    /// Byte range shared with the next chunk.
    pub overlap_next: Option<Range<usize>>,

    /// Conditions recorded while the chunk was produced.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<ChunkFlag>,

    /// Content hash for deduplication.
    pub content_hash: Option<String>,

    /// Titles of the enclosing headings, outermost first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub section_path: Vec<String>,

    /// The chunk contains a list item.
    #[serde(default)]
    pub has_list: bool,

    /// The chunk contains code.
    #[serde(default)]
    pub has_code: bool,

    /// Whitespace-separated words in the content.
    #[serde(default)]
    pub word_count: usize,

    /// Number of chunks in the set this chunk belongs to.
    #[serde(default)]
    pub total_chunks: usize,
}

/// Conditions a chunk can be flagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkFlag {
    /// An indivisible unit exceeded the budget and was emitted whole.
    OversizedAtomicUnit,
    /// The semantic strategy cut without a low-similarity boundary.
    ForcedCut,
}

impl Chunk {
    /// Creates a new chunk.
    ///
    /// # Arguments
    ///
    /// * `index` - Sequential index within the chunk set.
    /// * `content` - Chunk content.
    /// * `byte_range` - Byte range in the source text.
    /// * `token_count` - Token count of `content`.
    #[must_use]
    pub fn new(index: usize, content: String, byte_range: Range<usize>, token_count: usize) -> Self {
        Self {
            index,
            content,
            byte_range,
            token_count,
            node_refs: Vec::new(),
            metadata: ChunkMetadata::default(),
        }
    }

    /// Creates a chunk with a specific strategy name.
    #[must_use]
    pub fn with_strategy(
        index: usize,
        content: String,
        byte_range: Range<usize>,
        token_count: usize,
        strategy: &str,
    ) -> Self {
        let mut chunk = Self::new(index, content, byte_range, token_count);
        chunk.metadata.strategy = Some(strategy.to_string());
        chunk
    }

    /// Returns the size of the chunk in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.content.len()
    }

    /// Returns the byte range size.
    #[must_use]
    pub const fn range_size(&self) -> usize {
        self.byte_range.end - self.byte_range.start
    }

    /// Checks if the chunk is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Returns the start byte offset in the source text.
    #[must_use]
    pub const fn start(&self) -> usize {
        self.byte_range.start
    }

    /// Returns the end byte offset in the source text.
    #[must_use]
    pub const fn end(&self) -> usize {
        self.byte_range.end
    }

    /// Returns the strategy label, if set.
    #[must_use]
    pub fn strategy(&self) -> Option<&str> {
        self.metadata.strategy.as_deref()
    }

    /// Adds a flag unless already present.
    pub fn flag(&mut self, flag: ChunkFlag) {
        if !self.metadata.flags.contains(&flag) {
            self.metadata.flags.push(flag);
        }
    }

    /// Returns true if the chunk carries the given flag.
    #[must_use]
    pub fn has_flag(&self, flag: ChunkFlag) -> bool {
        self.metadata.flags.contains(&flag)
    }

    /// Returns true if the chunk was emitted over budget.
    #[must_use]
    pub fn is_oversized(&self) -> bool {
        self.has_flag(ChunkFlag::OversizedAtomicUnit)
    }

    /// Returns true if the chunk shares text with a neighbor.
    #[must_use]
    pub const fn has_overlap(&self) -> bool {
        self.metadata.overlap_prev.is_some() || self.metadata.overlap_next.is_some()
    }

    /// Computes and sets the content hash.
    pub fn compute_hash(&mut self) {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        self.content.hash(&mut hasher);
        self.metadata.content_hash = Some(format!("{:016x}", hasher.finish()));
    }

    /// Returns a preview of the chunk content (first `max_len` bytes, on a
    /// character boundary).
    #[must_use]
    pub fn preview(&self, max_len: usize) -> &str {
        if self.content.len() <= max_len {
            &self.content
        } else {
            let end = find_char_boundary(&self.content, max_len);
            &self.content[..end]
        }
    }

    /// Checks if this chunk's byte range overlaps with another range.
    #[must_use]
    pub const fn overlaps_with(&self, other_range: &Range<usize>) -> bool {
        self.byte_range.start < other_range.end && other_range.start < self.byte_range.end
    }

    /// Checks if this chunk's byte range contains a specific byte offset.
    #[must_use]
    pub fn contains_offset(&self, offset: usize) -> bool {
        self.byte_range.contains(&offset)
    }
}

/// A recorded fallback from one strategy to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegradationEvent {
    /// Strategy that was requested.
    pub from: String,
    /// Strategy that actually produced the chunks.
    pub to: String,
    /// Classification of the underlying failure.
    pub kind: ErrorKind,
    /// Human-readable reason.
    pub reason: String,
}

/// Ordered chunks produced by one strategy over one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSet {
    /// Identifier of the source document.
    pub document_id: String,

    /// Requested strategy name.
    pub strategy: String,

    /// Token budget the chunks were produced with.
    pub budget: usize,

    /// Chunks in source order.
    pub chunks: Vec<Chunk>,

    /// Fallbacks taken while producing the chunks.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degradations: Vec<DegradationEvent>,
}

impl ChunkSet {
    /// Creates an empty chunk set.
    #[must_use]
    pub fn new(document_id: impl Into<String>, strategy: impl Into<String>, budget: usize) -> Self {
        Self {
            document_id: document_id.into(),
            strategy: strategy.into(),
            budget,
            chunks: Vec::new(),
            degradations: Vec::new(),
        }
    }

    /// Number of chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Returns true if there are no chunks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Iterates over the chunks in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Chunk> {
        self.chunks.iter()
    }

    /// Number of chunks flagged as oversized.
    #[must_use]
    pub fn oversized_count(&self) -> usize {
        self.chunks.iter().filter(|c| c.is_oversized()).count()
    }

    /// Sum of chunk token counts.
    #[must_use]
    pub fn total_tokens(&self) -> usize {
        self.chunks.iter().map(|c| c.token_count).sum()
    }

    /// Returns true if the strategy fell back while producing this set.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }

    /// Returns true if chunk starts never decrease.
    #[must_use]
    pub fn is_ordered(&self) -> bool {
        self.chunks.windows(2).all(|w| w[0].start() <= w[1].start())
    }

    /// Returns source ranges not covered by any chunk that contain
    /// non-whitespace text.
    #[must_use]
    pub fn uncovered_ranges(&self, source: &str) -> Vec<Range<usize>> {
        let mut gaps = Vec::new();
        let mut cursor = 0;
        for chunk in &self.chunks {
            if chunk.start() > cursor {
                gaps.push(cursor..chunk.start());
            }
            cursor = cursor.max(chunk.end());
        }
        if cursor < source.len() {
            gaps.push(cursor..source.len());
        }
        gaps.retain(|gap| {
            source
                .get(gap.clone())
                .is_some_and(|text| !text.trim().is_empty())
        });
        gaps
    }
}

impl<'a> IntoIterator for &'a ChunkSet {
    type Item = &'a Chunk;
    type IntoIter = std::slice::Iter<'a, Chunk>;

    fn into_iter(self) -> Self::IntoIter {
        self.chunks.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_of(ranges: &[Range<usize>], source: &str) -> ChunkSet {
        let mut set = ChunkSet::new("doc", "test", 10);
        for (i, r) in ranges.iter().enumerate() {
            set.chunks
                .push(Chunk::new(i, source[r.clone()].to_string(), r.clone(), 1));
        }
        set
    }

    #[test]
    fn test_chunk_new() {
        let chunk = Chunk::new(0, "Hello".to_string(), 0..5, 2);
        assert_eq!(chunk.index, 0);
        assert_eq!(chunk.size(), 5);
        assert_eq!(chunk.range_size(), 5);
        assert_eq!(chunk.start(), 0);
        assert_eq!(chunk.end(), 5);
        assert_eq!(chunk.token_count, 2);
        assert!(chunk.node_refs.is_empty());
    }

    #[test]
    fn test_chunk_with_strategy() {
        let chunk = Chunk::with_strategy(1, "x".to_string(), 3..4, 1, "sentence");
        assert_eq!(chunk.strategy(), Some("sentence"));
    }

    #[test]
    fn test_chunk_flags_dedup() {
        let mut chunk = Chunk::new(0, "table".to_string(), 0..5, 500);
        chunk.flag(ChunkFlag::OversizedAtomicUnit);
        chunk.flag(ChunkFlag::OversizedAtomicUnit);
        assert_eq!(chunk.metadata.flags.len(), 1);
        assert!(chunk.is_oversized());
        assert!(!chunk.has_flag(ChunkFlag::ForcedCut));
    }

    #[test]
    fn test_chunk_overlap_markers() {
        let mut chunk = Chunk::new(1, "abc".to_string(), 5..8, 3);
        assert!(!chunk.has_overlap());
        chunk.metadata.overlap_prev = Some(5..6);
        assert!(chunk.has_overlap());
    }

    #[test]
    fn test_chunk_hash_is_stable() {
        let mut a = Chunk::new(0, "same".to_string(), 0..4, 1);
        let mut b = Chunk::new(7, "same".to_string(), 9..13, 1);
        a.compute_hash();
        b.compute_hash();
        assert!(a.metadata.content_hash.is_some());
        assert_eq!(a.metadata.content_hash, b.metadata.content_hash);
    }

    #[test]
    fn test_chunk_preview_respects_char_boundary() {
        let chunk = Chunk::new(0, "Hello 世界".to_string(), 0..12, 8);
        assert_eq!(chunk.preview(7), "Hello ");
        assert_eq!(chunk.preview(100), "Hello 世界");
    }

    #[test]
    fn test_chunk_overlaps_with() {
        let chunk = Chunk::new(0, "x".repeat(10), 10..20, 10);
        assert!(chunk.overlaps_with(&(15..25)));
        assert!(!chunk.overlaps_with(&(20..30)));
        assert!(chunk.contains_offset(10));
        assert!(!chunk.contains_offset(20));
    }

    #[test]
    fn test_chunk_set_counts() {
        let source = "alpha beta gamma";
        let mut set = set_of(&[0..5, 6..10, 11..16], source);
        set.chunks[2].flag(ChunkFlag::OversizedAtomicUnit);
        assert_eq!(set.len(), 3);
        assert_eq!(set.total_tokens(), 3);
        assert_eq!(set.oversized_count(), 1);
        assert!(set.is_ordered());
        assert!(!set.is_degraded());
    }

    #[test]
    fn test_uncovered_ranges_ignores_whitespace() {
        let source = "alpha beta gamma";
        let set = set_of(&[0..5, 6..10, 11..16], source);
        assert!(set.uncovered_ranges(source).is_empty());

        let set = set_of(&[0..5, 11..16], source);
        assert_eq!(set.uncovered_ranges(source), vec![5..11]);
    }

    #[test]
    fn test_chunk_serialization_skips_empty_fields() {
        let chunk = Chunk::new(0, "a".to_string(), 0..1, 1);
        let json = serde_json::to_string(&chunk).unwrap();
        assert!(!json.contains("node_refs"));
        assert!(!json.contains("flags"));
        let back: Chunk = serde_json::from_str(&json).unwrap();
        assert_eq!(back, chunk);
    }
}
