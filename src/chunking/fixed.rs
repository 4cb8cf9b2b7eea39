//! Fixed-size and overlap strategies.
//!
//! Cuts the text at token offsets every `chunk_size - overlap` tokens,
//! ignoring structure. This is the baseline every other strategy is
//! compared against.

use crate::chunking::StrategyConfig;
use crate::core::Chunk;
use crate::tokenizer::Tokenizer;

/// Splits `text` into windows of `chunk_size` tokens sharing `overlap`
/// tokens with their neighbor.
///
/// Windows that contain only whitespace are skipped.
pub fn split(
    text: &str,
    config: &StrategyConfig,
    tokenizer: &dyn Tokenizer,
    label: &'static str,
) -> Vec<Chunk> {
    let spans = tokenizer.token_spans(text);
    if spans.is_empty() {
        return Vec::new();
    }

    let size = config.chunk_size;
    let overlap = config.overlap;
    let step = size.saturating_sub(overlap).max(1);

    let mut chunks: Vec<Chunk> = Vec::new();
    let mut prev_emitted = false;
    let mut start = 0;

    loop {
        let end = (start + size).min(spans.len());
        let range = spans[start].start..spans[end - 1].end;
        let content = &text[range.clone()];

        if content.trim().is_empty() {
            prev_emitted = false;
        } else {
            let mut chunk = Chunk::with_strategy(
                0,
                content.to_string(),
                range,
                tokenizer.count_tokens(content),
                label,
            );
            if start > 0 && overlap > 0 && prev_emitted {
                let shared_end = (start + overlap).min(end);
                let shared = spans[start].start..spans[shared_end - 1].end;
                if let Some(prev) = chunks.last_mut() {
                    prev.metadata.overlap_next = Some(shared.clone());
                }
                chunk.metadata.overlap_prev = Some(shared);
            }
            chunks.push(chunk);
            prev_emitted = true;
        }

        if end == spans.len() {
            break;
        }
        start += step;
    }

    chunks
}
