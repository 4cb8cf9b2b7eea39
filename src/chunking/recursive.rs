//! Recursive separator cascade.
//!
//! A span that fits the budget is kept whole. One that doesn't is cut at the
//! first separator level (paragraph, sentence, clause, word) whose pieces
//! all fit, each level refining the cuts of the coarser ones. When no level
//! gets every piece under budget, the span is divided at the coarsest
//! separator that applies and each piece recurses from the next finer one.
//! A span no separator divides is cut into windows of `chunk_size` tokens,
//! which always succeeds. The resulting pieces are then packed greedily.

use crate::chunking::pack::{Packer, Unit};
use crate::chunking::{BoundaryPolicy, StrategyConfig};
use crate::core::Chunk;
use crate::text::{Separator, trim_span};
use crate::tokenizer::Tokenizer;
use std::ops::Range;

struct Cascade<'a> {
    text: &'a str,
    tokenizer: &'a dyn Tokenizer,
    budget: usize,
}

impl Cascade<'_> {
    fn fits(&self, span: &Range<usize>) -> bool {
        self.tokenizer.count_tokens(&self.text[span.clone()]) <= self.budget
    }

    fn pieces(&self, range: Range<usize>, level: usize, out: &mut Vec<Unit>) {
        let span = trim_span(self.text, range);
        if span.is_empty() {
            return;
        }
        if self.fits(&span) {
            out.push(Unit::new(span));
            return;
        }

        let mut parts = vec![span.clone()];
        for separator in &Separator::CASCADE[level.min(Separator::CASCADE.len())..] {
            parts = parts
                .into_iter()
                .flat_map(|part| separator.split(self.text, part))
                .collect();
            if parts.len() > 1 && parts.iter().all(|part| self.fits(part)) {
                out.extend(parts.into_iter().map(Unit::new));
                return;
            }
        }

        for (offset, separator) in Separator::CASCADE.iter().enumerate().skip(level) {
            let parts = separator.split(self.text, span.clone());
            if parts.len() > 1 {
                for part in parts {
                    self.pieces(part, offset + 1, out);
                }
                return;
            }
        }

        self.token_windows(span, out);
    }

    fn token_windows(&self, span: Range<usize>, out: &mut Vec<Unit>) {
        let tokens = self.tokenizer.token_spans(&self.text[span.clone()]);
        if tokens.is_empty() {
            out.push(Unit::new(span));
            return;
        }
        for window in tokens.chunks(self.budget.max(1)) {
            let (Some(first), Some(last)) = (window.first(), window.last()) else {
                continue;
            };
            let piece = trim_span(self.text, span.start + first.start..span.start + last.end);
            if !piece.is_empty() {
                out.push(Unit::new(piece));
            }
        }
    }
}

/// Splits `text` with the separator cascade.
///
/// The cascade starts at sentences when the boundary policy asks for
/// sentence granularity, and at paragraphs otherwise.
pub fn split(
    text: &str,
    config: &StrategyConfig,
    tokenizer: &dyn Tokenizer,
    label: &'static str,
) -> Vec<Chunk> {
    let start_level = match config.boundary_policy {
        BoundaryPolicy::Sentence => 1,
        _ => 0,
    };

    let cascade = Cascade {
        text,
        tokenizer,
        budget: config.chunk_size,
    };
    let mut units = Vec::new();
    cascade.pieces(0..text.len(), start_level, &mut units);

    Packer::new(text, tokenizer, config.chunk_size, label)
        .with_overlap(config.overlap)
        .pack(&units)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::{CharTokenizer, HeuristicTokenizer, WordTokenizer};

    fn contents(chunks: &[Chunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.content.as_str()).collect()
    }

    #[test]
    fn test_fits_whole() {
        let text = "Short text.\n\nStill short.";
        let chunks = split(text, &StrategyConfig::new(100), &CharTokenizer, "recursive");
        assert_eq!(contents(&chunks), vec![text]);
    }

    #[test]
    fn test_descends_to_clauses() {
        let text = "alpha beta, gamma delta, epsilon zeta";
        let chunks = split(text, &StrategyConfig::new(12), &CharTokenizer, "recursive");
        assert_eq!(
            contents(&chunks),
            vec!["alpha beta,", "gamma delta,", "epsilon zeta"]
        );
    }

    #[test]
    fn test_descends_to_words() {
        let text = "one two three four five";
        let chunks = split(text, &StrategyConfig::new(9), &CharTokenizer, "recursive");
        assert_eq!(contents(&chunks), vec!["one two", "three", "four five"]);
        assert!(chunks.iter().all(|c| c.token_count <= 9));
    }

    #[test]
    fn test_giant_word_cut_into_windows() {
        let text = "a".repeat(1_000);
        let chunks = split(&text, &StrategyConfig::new(100), &CharTokenizer, "recursive");
        assert_eq!(chunks.len(), 10);
        assert!(chunks.iter().all(|c| c.token_count == 100 && !c.is_oversized()));
        assert_eq!(chunks[9].byte_range, 900..1_000);
    }

    #[test]
    fn test_giant_word_with_heuristic_tokenizer() {
        let text = "x".repeat(4_000);
        let chunks = split(&text, &StrategyConfig::new(50), &HeuristicTokenizer::new(), "recursive");
        // 1,000 four-character tokens in windows of 50.
        assert_eq!(chunks.len(), 20);
        assert!(chunks.iter().all(|c| c.token_count <= 50));
    }

    #[test]
    fn test_keeps_paragraphs_when_they_fit() {
        let text = "Para one here.\n\nPara two is a bit longer. It has two sentences.";
        let chunks = split(text, &StrategyConfig::new(10), &WordTokenizer, "recursive");
        assert_eq!(
            contents(&chunks),
            vec!["Para one here.", "Para two is a bit longer.", "It has two sentences."]
        );
    }

    #[test]
    fn test_sentence_with_oversized_neighbour_cut_at_clauses() {
        // The last sentence only fits as clauses, so the whole span is cut at
        // clause level and "Yes, indeed." no longer stays together.
        let text = "Hi there. Yes, indeed. Alpha beta gamma, delta epsilon zeta.";
        let chunks = split(text, &StrategyConfig::new(20), &CharTokenizer, "recursive");
        assert_eq!(
            contents(&chunks),
            vec!["Hi there. Yes,", "indeed.", "Alpha beta gamma,", "delta epsilon zeta."]
        );
        assert!(chunks.iter().all(|c| c.token_count <= 20));
    }

    #[test]
    fn test_giant_word_stays_local() {
        let text = format!("Small paragraph here.\n\n{}", "z".repeat(30));
        let chunks = split(&text, &StrategyConfig::new(25), &CharTokenizer, "recursive");
        assert_eq!(chunks[0].content, "Small paragraph here.");
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.token_count <= 25));
    }

    #[test]
    fn test_empty_text() {
        assert!(split("", &StrategyConfig::new(10), &CharTokenizer, "recursive").is_empty());
    }
}
