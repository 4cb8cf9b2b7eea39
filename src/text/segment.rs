//! Boundary detection for paragraphs, sentences, clauses and words.
//!
//! Every function works on a byte range of a source text and returns
//! absolute byte spans into that same text. Spans are trimmed of
//! surrounding whitespace and never empty, so slicing the source with them
//! yields the unit's text directly.

use regex::Regex;
use std::ops::Range;
use std::sync::OnceLock;

/// Granularity of a separator, coarsest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Separator {
    /// Blank lines.
    Paragraph,
    /// Terminal punctuation followed by whitespace.
    Sentence,
    /// Commas, semicolons and colons followed by whitespace.
    Clause,
    /// Whitespace.
    Word,
}

impl Separator {
    /// All separators, coarsest first.
    pub const CASCADE: [Self; 4] = [Self::Paragraph, Self::Sentence, Self::Clause, Self::Word];

    /// Returns the compiled regex for this separator.
    #[allow(clippy::expect_used)]
    fn regex(self) -> &'static Regex {
        macro_rules! static_regex {
            ($name:ident, $pattern:expr) => {{
                static $name: OnceLock<Regex> = OnceLock::new();
                $name.get_or_init(|| Regex::new($pattern).expect("valid regex"))
            }};
        }

        match self {
            Self::Paragraph => static_regex!(PARAGRAPH, r"\r?\n[ \t\r]*\n\s*"),
            Self::Sentence => static_regex!(SENTENCE, r#"[.!?]+["')\]]*\s+"#),
            Self::Clause => static_regex!(CLAUSE, r"[,;:]\s+"),
            Self::Word => static_regex!(WORD, r"\s+"),
        }
    }

    /// Splits `range` of `text` at this separator.
    #[must_use]
    pub fn split(self, text: &str, range: Range<usize>) -> Vec<Range<usize>> {
        match self {
            Self::Paragraph => paragraph_spans(text, range),
            Self::Sentence => sentence_spans(text, range),
            Self::Clause | Self::Word => split_at(self.regex(), text, range),
        }
    }

    /// Returns the separator name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Paragraph => "paragraph",
            Self::Sentence => "sentence",
            Self::Clause => "clause",
            Self::Word => "word",
        }
    }
}

/// Trims whitespace from both ends of a span.
#[must_use]
pub fn trim_span(text: &str, range: Range<usize>) -> Range<usize> {
    let slice = &text[range.clone()];
    let leading = slice.len() - slice.trim_start().len();
    let trailing = slice.len() - slice.trim_end().len();
    if leading == slice.len() {
        return range.start..range.start;
    }
    range.start + leading..range.end - trailing
}

/// Cuts `range` after every match of `re`, trimming and dropping blanks.
fn split_at(re: &Regex, text: &str, range: Range<usize>) -> Vec<Range<usize>> {
    let slice = &text[range.clone()];
    let mut spans = Vec::new();
    let mut cursor = 0;
    for m in re.find_iter(slice) {
        push_trimmed(&mut spans, text, range.start + cursor..range.start + m.end());
        cursor = m.end();
    }
    push_trimmed(&mut spans, text, range.start + cursor..range.end);
    spans
}

fn push_trimmed(spans: &mut Vec<Range<usize>>, text: &str, range: Range<usize>) {
    let trimmed = trim_span(text, range);
    if !trimmed.is_empty() {
        spans.push(trimmed);
    }
}

/// Paragraph spans: text separated by one or more blank lines.
///
/// # Examples
///
/// ```
/// use chunkbench::text::paragraph_spans;
///
/// let text = "First.\n\nSecond.";
/// let spans = paragraph_spans(text, 0..text.len());
/// assert_eq!(spans, vec![0..6, 8..15]);
/// ```
#[must_use]
pub fn paragraph_spans(text: &str, range: Range<usize>) -> Vec<Range<usize>> {
    split_at(Separator::Paragraph.regex(), text, range)
}

/// Sentence spans: `.`, `!` or `?` (optionally followed by closing quotes
/// or brackets) and then whitespace ends a sentence. Paragraph breaks
/// always end a sentence.
///
/// # Examples
///
/// ```
/// use chunkbench::text::sentence_spans;
///
/// let text = "Hello world. How are you? Fine";
/// let spans = sentence_spans(text, 0..text.len());
/// let sentences: Vec<&str> = spans.into_iter().map(|s| &text[s]).collect();
/// assert_eq!(sentences, vec!["Hello world.", "How are you?", "Fine"]);
/// ```
#[must_use]
pub fn sentence_spans(text: &str, range: Range<usize>) -> Vec<Range<usize>> {
    paragraph_spans(text, range)
        .into_iter()
        .flat_map(|paragraph| split_at(Separator::Sentence.regex(), text, paragraph))
        .collect()
}

/// Clause spans: cuts after `,`, `;` or `:` followed by whitespace.
#[must_use]
pub fn clause_spans(text: &str, range: Range<usize>) -> Vec<Range<usize>> {
    Separator::Clause.split(text, range)
}

/// Whitespace-separated word spans.
#[must_use]
pub fn word_spans(text: &str, range: Range<usize>) -> Vec<Range<usize>> {
    Separator::Word.split(text, range)
}
