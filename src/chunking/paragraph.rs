//! Paragraph-aware strategy.
//!
//! Paragraphs accumulate like sentences do in the sentence strategy. A
//! paragraph that alone exceeds the budget is replaced by its sentences,
//! packed on their own between hard breaks so they never merge with a
//! neighboring paragraph.

use crate::chunking::StrategyConfig;
use crate::chunking::pack::{Packer, Unit};
use crate::chunking::sentence::sentence_units;
use crate::core::Chunk;
use crate::text::paragraph_spans;
use crate::tokenizer::Tokenizer;
use std::ops::Range;

/// Paragraph units covering `range`, with sentence fallback for
/// paragraphs over `budget`.
pub fn paragraph_units(
    text: &str,
    range: Range<usize>,
    tokenizer: &dyn Tokenizer,
    budget: usize,
) -> Vec<Unit> {
    let mut units = Vec::new();
    let mut after_fallback = false;

    for span in paragraph_spans(text, range) {
        if tokenizer.count_tokens(&text[span.clone()]) <= budget {
            units.push(Unit::new(span).with_hard_break(after_fallback));
            after_fallback = false;
        } else {
            units.extend(sentence_units(text, span, true));
            after_fallback = true;
        }
    }
    units
}

/// Splits `text` at paragraph boundaries.
pub fn split(
    text: &str,
    config: &StrategyConfig,
    tokenizer: &dyn Tokenizer,
    label: &'static str,
) -> Vec<Chunk> {
    let units = paragraph_units(text, 0..text.len(), tokenizer, config.chunk_size);
    Packer::new(text, tokenizer, config.chunk_size, label)
        .with_overlap(config.overlap)
        .pack(&units)
}
