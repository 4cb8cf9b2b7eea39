//! Text utilities shared by the chunking strategies.

pub mod segment;
pub mod unicode;

pub use segment::{
    Separator, clause_spans, paragraph_spans, sentence_spans, trim_span, word_spans,
};
pub use unicode::{find_char_boundary, find_char_boundary_forward, normalize_whitespace};
