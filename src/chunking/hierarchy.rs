//! Hierarchy-aware strategy.
//!
//! Walks the structural tree depth-first. Tables and code blocks are
//! atomic units: they are never split, and one that exceeds the budget is
//! emitted alone and flagged. Headings at or above the configured level
//! always open a new chunk. Prose nodes that exceed the budget fall back to
//! their sentences. A document without a tree is treated as a sequence of
//! paragraph nodes.

use crate::chunking::StrategyConfig;
use crate::chunking::pack::{Packer, Unit};
use crate::chunking::paragraph::paragraph_units;
use crate::chunking::sentence::sentence_units;
use crate::core::{Chunk, Document, NodeKind, StructuralNode};
use crate::error::ChunkingError;
use crate::text::trim_span;
use crate::tokenizer::Tokenizer;
use std::ops::Range;

struct Walker<'a> {
    text: &'a str,
    tokenizer: &'a dyn Tokenizer,
    budget: usize,
    heading_level: u8,
    units: Vec<Unit>,
    pending_break: bool,
}

impl Walker<'_> {
    fn push(&mut self, unit: Unit) {
        let hard_break = unit.hard_break || std::mem::take(&mut self.pending_break);
        self.units.push(unit.with_hard_break(hard_break));
    }

    fn visit(&mut self, node: &StructuralNode) {
        if node.kind.is_atomic() {
            let span = trim_span(self.text, node.span.clone());
            if !span.is_empty() {
                self.push(Unit::atomic(span));
            }
            return;
        }

        if node.kind == NodeKind::Heading {
            let own = self.own_span(node);
            if !own.is_empty() {
                let level = node.level.unwrap_or(1);
                self.push(Unit::new(own).with_hard_break(level <= self.heading_level));
            }
            for child in &node.children {
                self.visit(child);
            }
            return;
        }

        let span = trim_span(self.text, node.span.clone());
        if span.is_empty() {
            return;
        }
        if self.fits(&span) {
            self.push(Unit::new(span));
            return;
        }
        if node.is_leaf() {
            self.prose_fallback(span);
            return;
        }

        let own = self.own_span(node);
        if !own.is_empty() {
            if self.fits(&own) {
                self.push(Unit::new(own));
            } else {
                self.prose_fallback(own);
            }
        }
        for child in &node.children {
            self.visit(child);
        }
    }

    /// Text of a node before its first child.
    fn own_span(&self, node: &StructuralNode) -> Range<usize> {
        let end = node
            .children
            .first()
            .map_or(node.span.end, |child| child.span.start);
        trim_span(self.text, node.span.start..end)
    }

    fn fits(&self, span: &Range<usize>) -> bool {
        self.tokenizer.count_tokens(&self.text[span.clone()]) <= self.budget
    }

    fn prose_fallback(&mut self, span: Range<usize>) {
        self.pending_break = false;
        self.units.extend(sentence_units(self.text, span, true));
        self.pending_break = true;
    }
}

/// Splits `document` following its structural tree.
///
/// # Errors
///
/// Returns [`ChunkingError::InvalidSpan`] if a node span does not fit the
/// document text.
pub fn split(
    document: &Document,
    config: &StrategyConfig,
    tokenizer: &dyn Tokenizer,
    label: &'static str,
) -> Result<Vec<Chunk>, ChunkingError> {
    let text = document.text.as_str();

    let units = if document.is_flat() {
        paragraph_units(text, 0..text.len(), tokenizer, config.chunk_size)
    } else {
        document.validate()?;
        let mut walker = Walker {
            text,
            tokenizer,
            budget: config.chunk_size,
            heading_level: config.heading_level,
            units: Vec::new(),
            pending_break: false,
        };
        for node in &document.nodes {
            walker.visit(node);
        }
        walker.units
    };

    Ok(Packer::new(text, tokenizer, config.chunk_size, label)
        .with_overlap(config.overlap)
        .pack(&units))
}
