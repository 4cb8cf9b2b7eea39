//! Sentence-aware strategy.
//!
//! Whole sentences accumulate until the next one would exceed the budget.
//! A sentence that alone exceeds the budget becomes its own flagged chunk.

use crate::chunking::StrategyConfig;
use crate::chunking::pack::{Packer, Unit};
use crate::core::Chunk;
use crate::text::sentence_spans;
use crate::tokenizer::Tokenizer;
use std::ops::Range;

/// Sentence units covering `range`; the first one opens a new chunk when
/// `hard_break` is set.
pub fn sentence_units(text: &str, range: Range<usize>, hard_break: bool) -> Vec<Unit> {
    sentence_spans(text, range)
        .into_iter()
        .enumerate()
        .map(|(i, span)| Unit::new(span).with_hard_break(hard_break && i == 0))
        .collect()
}

/// Splits `text` at sentence boundaries.
pub fn split(
    text: &str,
    config: &StrategyConfig,
    tokenizer: &dyn Tokenizer,
    label: &'static str,
) -> Vec<Chunk> {
    let units = sentence_units(text, 0..text.len(), false);
    Packer::new(text, tokenizer, config.chunk_size, label)
        .with_overlap(config.overlap)
        .pack(&units)
}
