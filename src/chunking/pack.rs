//! Greedy packing of boundary-aligned units into chunks.
//!
//! Unit-based strategies (sentence, paragraph, hierarchy, recursive)
//! differ only in how they cut the source into units. Packing is shared:
//! units accumulate until the next one would push the chunk over budget,
//! a unit that alone exceeds the budget is emitted whole and flagged, and
//! hard breaks always close the current chunk.

use crate::core::{Chunk, ChunkFlag};
use crate::tokenizer::Tokenizer;
use std::ops::Range;
use tracing::warn;

/// A span of source text that is never cut by the packer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    /// Byte span in the source text.
    pub span: Range<usize>,
    /// Indivisible structure (table, code block); never carried as overlap.
    pub atomic: bool,
    /// Close the current chunk before this unit.
    pub hard_break: bool,
}

impl Unit {
    /// Creates a plain unit.
    #[must_use]
    pub const fn new(span: Range<usize>) -> Self {
        Self {
            span,
            atomic: false,
            hard_break: false,
        }
    }

    /// Creates an atomic unit.
    #[must_use]
    pub const fn atomic(span: Range<usize>) -> Self {
        Self {
            span,
            atomic: true,
            hard_break: false,
        }
    }

    /// Marks the unit as opening a new chunk.
    #[must_use]
    pub const fn with_hard_break(mut self, hard_break: bool) -> Self {
        self.hard_break = hard_break;
        self
    }
}

/// Packs units into chunks under a token budget.
pub struct Packer<'a> {
    text: &'a str,
    tokenizer: &'a dyn Tokenizer,
    budget: usize,
    overlap: usize,
    label: &'static str,
}

impl<'a> Packer<'a> {
    /// Creates a packer over `text`.
    pub fn new(text: &'a str, tokenizer: &'a dyn Tokenizer, budget: usize, label: &'static str) -> Self {
        Self {
            text,
            tokenizer,
            budget,
            overlap: 0,
            label,
        }
    }

    /// Sets the overlap carried between chunks, in tokens.
    #[must_use]
    pub const fn with_overlap(mut self, overlap: usize) -> Self {
        self.overlap = overlap;
        self
    }

    /// Token count of `span`, or `usize::MAX` if it is not a valid slice.
    fn count(&self, span: Range<usize>) -> usize {
        self.text
            .get(span)
            .map_or(usize::MAX, |slice| self.tokenizer.count_tokens(slice))
    }

    fn fits(&self, span: Range<usize>) -> bool {
        span.start <= span.end && self.count(span) <= self.budget
    }

    /// Packs `units` (sorted by position, non-overlapping) into chunks.
    ///
    /// A unit that starts before the end of the previous one, or whose span
    /// is not a valid slice of the text, is skipped.
    ///
    /// Chunk indices are left at zero; the caller numbers the final set.
    #[must_use]
    pub fn pack(&self, units: &[Unit]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let mut current: Vec<&Unit> = Vec::new();
        // Leading units of `current` that repeat the tail of the previous chunk.
        let mut carried = 0;
        let mut cursor = 0;

        for unit in units {
            if unit.span.start < cursor || self.text.get(unit.span.clone()).is_none() {
                warn!(
                    start = unit.span.start,
                    end = unit.span.end,
                    "skipping unit outside source order"
                );
                continue;
            }
            cursor = unit.span.end;

            let tokens = self.count(unit.span.clone());
            if tokens > self.budget {
                self.flush(&mut chunks, &current, carried);
                current.clear();
                carried = 0;
                let mut chunk = self.chunk_for(unit.span.clone(), tokens);
                chunk.flag(ChunkFlag::OversizedAtomicUnit);
                chunks.push(chunk);
                continue;
            }

            if unit.hard_break {
                self.flush(&mut chunks, &current, carried);
                current.clear();
                carried = 0;
            }

            let Some(first) = current.first() else {
                current.push(unit);
                continue;
            };

            if self.fits(first.span.start..unit.span.end) {
                current.push(unit);
                continue;
            }

            self.flush(&mut chunks, &current, carried);
            current = self.carry(&current, carried, unit);
            carried = current.len();
            current.push(unit);
        }

        self.flush(&mut chunks, &current, carried);
        chunks
    }

    /// Trailing units of a flushed chunk to repeat at the start of the next.
    ///
    /// Never includes the first unit, atomic units, or units already
    /// carried, and always leaves room for `next`.
    fn carry<'u>(&self, flushed: &[&'u Unit], carried: usize, next: &Unit) -> Vec<&'u Unit> {
        if self.overlap == 0 || flushed.len() < 2 {
            return Vec::new();
        }
        let Some(last) = flushed.last() else {
            return Vec::new();
        };

        let mut from = flushed.len();
        for i in (carried.max(1)..flushed.len()).rev() {
            let unit = flushed[i];
            if unit.atomic
                || self.count(unit.span.start..last.span.end) > self.overlap
                || !self.fits(unit.span.start..next.span.end)
            {
                break;
            }
            from = i;
        }
        flushed[from..].to_vec()
    }

    /// Emits `units` as one chunk unless they are all carried units.
    fn flush(&self, chunks: &mut Vec<Chunk>, units: &[&Unit], carried: usize) {
        if units.len() <= carried {
            return;
        }
        let (Some(first), Some(last)) = (units.first(), units.last()) else {
            return;
        };

        let span = first.span.start..last.span.end;
        let tokens = self.count(span.clone());
        let mut chunk = self.chunk_for(span, tokens);

        if carried > 0 {
            let shared = first.span.start..units[carried - 1].span.end;
            if let Some(prev) = chunks.last_mut() {
                prev.metadata.overlap_next = Some(shared.clone());
            }
            chunk.metadata.overlap_prev = Some(shared);
        }
        chunks.push(chunk);
    }

    fn chunk_for(&self, span: Range<usize>, tokens: usize) -> Chunk {
        let content = self.text.get(span.clone()).unwrap_or_default().to_string();
        Chunk::with_strategy(0, content, span, tokens, self.label)
    }
}
