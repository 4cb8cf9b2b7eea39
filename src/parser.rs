//! Structural parser boundary.
//!
//! A [`StructuralParser`] turns raw bytes and a declared format into a
//! [`Document`]. Format-specific extraction (Markdown, HTML) lives outside
//! this crate; the built-in [`PlainTextParser`] covers plain text and
//! extracted table text.

use crate::core::{Document, DocumentFormat, StructuralNode};
use crate::error::{ParseError, Result};
use crate::text::paragraph_spans;
use std::sync::Arc;

/// Parses raw document bytes into a structural tree.
pub trait StructuralParser: Send + Sync {
    /// Returns the parser name.
    fn name(&self) -> &str {
        "parser"
    }

    /// Parses `bytes` declared as `format` into the document `id`.
    ///
    /// # Errors
    ///
    /// Returns a parse error if the bytes are not valid for the format or
    /// the format is not handled.
    fn parse(&self, id: &str, bytes: &[u8], format: DocumentFormat) -> Result<Document>;
}

impl<P: StructuralParser + ?Sized> StructuralParser for Arc<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn parse(&self, id: &str, bytes: &[u8], format: DocumentFormat) -> Result<Document> {
        (**self).parse(id, bytes, format)
    }
}

/// Shared parser handle.
pub type SharedParser = Arc<dyn StructuralParser>;

/// Parser for plain text and extracted table text.
///
/// Plain text becomes one paragraph node per blank-line separated block.
/// Table text becomes one atomic table node per block.
///
/// # Examples
///
/// ```
/// use chunkbench::core::{DocumentFormat, NodeKind};
/// use chunkbench::parser::{PlainTextParser, StructuralParser};
///
/// let doc = PlainTextParser
///     .parse("notes", b"First.\n\nSecond.", DocumentFormat::PlainText)
///     .unwrap();
/// assert_eq!(doc.nodes.len(), 2);
/// assert_eq!(doc.nodes[0].kind, NodeKind::Paragraph);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextParser;

impl StructuralParser for PlainTextParser {
    fn name(&self) -> &str {
        "plain_text"
    }

    fn parse(&self, id: &str, bytes: &[u8], format: DocumentFormat) -> Result<Document> {
        let node: fn(std::ops::Range<usize>) -> StructuralNode = match format {
            DocumentFormat::PlainText => StructuralNode::paragraph,
            DocumentFormat::Table => StructuralNode::table,
            DocumentFormat::Markdown | DocumentFormat::Html => {
                return Err(ParseError::UnsupportedFormat {
                    format: format.name().to_string(),
                }
                .into());
            }
        };

        let text = std::str::from_utf8(bytes).map_err(ParseError::from)?;
        let nodes = paragraph_spans(text, 0..text.len())
            .into_iter()
            .map(node)
            .collect();

        Ok(Document::with_nodes(id, text, format, nodes))
    }
}
