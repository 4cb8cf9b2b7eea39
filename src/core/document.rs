//! Documents and their structural tree.
//!
//! A [`Document`] is the source text plus, when a structural parser was
//! involved, a tree of [`StructuralNode`]s with byte spans into that text.
//! Documents are read-only input to the chunking strategies.

use crate::error::ChunkingError;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Identifier of a structural node: its position in a pre-order walk.
pub type NodeId = usize;

/// Kind of a structural node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Section heading with a level (1 is the top).
    Heading,
    /// Prose paragraph.
    Paragraph,
    /// Item of a bulleted or numbered list.
    ListItem,
    /// Table (atomic).
    Table,
    /// Code block (atomic).
    CodeBlock,
    /// Text without further structure.
    RawText,
}

impl NodeKind {
    /// Returns true for kinds that must never be split.
    #[must_use]
    pub const fn is_atomic(self) -> bool {
        matches!(self, Self::Table | Self::CodeBlock)
    }

    /// Returns true for prose kinds that may fall back to sentences.
    #[must_use]
    pub const fn is_prose(self) -> bool {
        matches!(self, Self::Paragraph | Self::ListItem | Self::RawText)
    }
}

/// Node of the structural tree produced by a parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralNode {
    /// Node kind.
    pub kind: NodeKind,
    /// Heading level, for headings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
    /// Byte span in the document text, including children.
    pub span: Range<usize>,
    /// Ordered children.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<StructuralNode>,
}

impl StructuralNode {
    /// Creates a childless node.
    #[must_use]
    pub const fn new(kind: NodeKind, span: Range<usize>) -> Self {
        Self {
            kind,
            level: None,
            span,
            children: Vec::new(),
        }
    }

    /// Creates a heading node.
    #[must_use]
    pub const fn heading(level: u8, span: Range<usize>) -> Self {
        Self {
            kind: NodeKind::Heading,
            level: Some(level),
            span,
            children: Vec::new(),
        }
    }

    /// Creates a paragraph node.
    #[must_use]
    pub const fn paragraph(span: Range<usize>) -> Self {
        Self::new(NodeKind::Paragraph, span)
    }

    /// Creates a table node.
    #[must_use]
    pub const fn table(span: Range<usize>) -> Self {
        Self::new(NodeKind::Table, span)
    }

    /// Attaches children.
    #[must_use]
    pub fn with_children(mut self, children: Vec<Self>) -> Self {
        self.children = children;
        self
    }

    /// Returns true if the node has no children.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of nodes in this subtree, including itself.
    #[must_use]
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(Self::subtree_len).sum::<usize>()
    }
}

/// Declared source format of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    /// Unstructured text.
    #[default]
    PlainText,
    /// Markdown source.
    Markdown,
    /// HTML source.
    Html,
    /// Text extracted from tables.
    Table,
}

impl DocumentFormat {
    /// Returns the format name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::PlainText => "plain_text",
            Self::Markdown => "markdown",
            Self::Html => "html",
            Self::Table => "table",
        }
    }
}

/// A document ready for chunking.
///
/// # Examples
///
/// ```
/// use chunkbench::core::Document;
///
/// let doc = Document::from_text("notes", "First paragraph.\n\nSecond one.");
/// assert!(doc.is_flat());
/// assert_eq!(doc.len(), 29);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Document identifier.
    pub id: String,
    /// Source text.
    pub text: String,
    /// Declared format.
    #[serde(default)]
    pub format: DocumentFormat,
    /// Root nodes of the structural tree (empty for flat text).
    #[serde(default)]
    pub nodes: Vec<StructuralNode>,
    /// Byte offsets where the author marks a topic change.
    #[serde(default)]
    pub topic_boundaries: Vec<usize>,
}

impl Document {
    /// Creates a flat document with no structural tree.
    pub fn from_text(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            format: DocumentFormat::PlainText,
            nodes: Vec::new(),
            topic_boundaries: Vec::new(),
        }
    }

    /// Creates a document with a structural tree.
    pub fn with_nodes(
        id: impl Into<String>,
        text: impl Into<String>,
        format: DocumentFormat,
        nodes: Vec<StructuralNode>,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            format,
            nodes,
            topic_boundaries: Vec::new(),
        }
    }

    /// Sets the topic boundaries.
    #[must_use]
    pub fn with_topic_boundaries(mut self, mut boundaries: Vec<usize>) -> Self {
        boundaries.sort_unstable();
        boundaries.dedup();
        self.topic_boundaries = boundaries;
        self
    }

    /// Length of the text in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Returns true if the text is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Returns true if the document has no structural tree.
    #[must_use]
    pub fn is_flat(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Walks the tree in pre-order, yielding `(id, depth, node)`.
    #[must_use]
    pub fn walk(&self) -> Vec<(NodeId, usize, &StructuralNode)> {
        fn visit<'a>(
            node: &'a StructuralNode,
            depth: usize,
            out: &mut Vec<(NodeId, usize, &'a StructuralNode)>,
        ) {
            out.push((out.len(), depth, node));
            for child in &node.children {
                visit(child, depth + 1, out);
            }
        }

        let mut out = Vec::new();
        for node in &self.nodes {
            visit(node, 0, &mut out);
        }
        out
    }

    /// Ids of the nodes whose span intersects `range`.
    #[must_use]
    pub fn nodes_intersecting(&self, range: &Range<usize>) -> Vec<NodeId> {
        self.walk()
            .into_iter()
            .filter(|(_, _, node)| node.span.start < range.end && range.start < node.span.end)
            .map(|(id, _, _)| id)
            .collect()
    }

    /// Checks that every node span lies inside the text on character
    /// boundaries and inside its parent's span, and that siblings are in
    /// source order without overlapping.
    pub fn validate(&self) -> Result<(), ChunkingError> {
        fn invalid(span: &Range<usize>, text: &str) -> ChunkingError {
            ChunkingError::InvalidSpan {
                start: span.start,
                end: span.end,
                len: text.len(),
            }
        }

        fn check_siblings(
            nodes: &[StructuralNode],
            parent: &Range<usize>,
            text: &str,
        ) -> Result<(), ChunkingError> {
            let mut cursor = parent.start;
            for node in nodes {
                let span = &node.span;
                let fits = span.start <= span.end
                    && span.start >= cursor
                    && span.end <= parent.end
                    && text.is_char_boundary(span.start)
                    && text.is_char_boundary(span.end);
                if !fits {
                    return Err(invalid(span, text));
                }
                check_siblings(&node.children, span, text)?;
                cursor = span.end;
            }
            Ok(())
        }

        check_siblings(&self.nodes, &(0..self.text.len()), &self.text)
    }
}
