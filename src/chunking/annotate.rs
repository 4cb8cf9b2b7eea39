//! Context metadata attached to every chunk of a set.
//!
//! Headings come from the structural tree when the document has one, and
//! from Markdown `#` lines otherwise. A chunk's section path is the stack
//! of headings open at its first byte.

use crate::core::{ChunkSet, Document, NodeKind};
use regex::Regex;
use std::sync::OnceLock;

macro_rules! static_regex {
    ($name:ident, $pattern:expr) => {{
        static $name: OnceLock<Regex> = OnceLock::new();
        $name.get_or_init(|| Regex::new($pattern).expect("valid regex"))
    }};
}

#[allow(clippy::expect_used)]
fn heading_line() -> &'static Regex {
    static_regex!(HEADING_LINE, r"(?m)^(#+)[ \t]+(.+)$")
}

#[allow(clippy::expect_used)]
fn list_marker() -> &'static Regex {
    static_regex!(LIST_MARKER, r"(?m)^[ \t]*(?:[-*•+]|\d+[.)])[ \t]+\S")
}

#[derive(Debug, PartialEq, Eq)]
struct Heading {
    start: usize,
    level: u8,
    title: String,
}

fn headings(document: &Document) -> Vec<Heading> {
    if document.is_flat() {
        return heading_line()
            .captures_iter(&document.text)
            .filter_map(|caps| {
                let (line, hashes, title) = (caps.get(0)?, caps.get(1)?, caps.get(2)?);
                Some(Heading {
                    start: line.start(),
                    level: u8::try_from(hashes.len()).unwrap_or(u8::MAX),
                    title: title.as_str().trim().to_string(),
                })
            })
            .collect();
    }

    document
        .walk()
        .into_iter()
        .filter(|(_, _, node)| node.kind == NodeKind::Heading)
        .filter_map(|(_, _, node)| {
            let line = document.text.get(node.span.clone())?.lines().next()?;
            let title = line.trim().trim_start_matches('#').trim();
            (!title.is_empty()).then(|| Heading {
                start: node.span.start,
                level: node.level.unwrap_or(1),
                title: title.to_string(),
            })
        })
        .collect()
}

/// Titles of the headings open at `offset`, outermost first.
fn section_path(headings: &[Heading], offset: usize) -> Vec<String> {
    let mut open: Vec<&Heading> = Vec::new();
    for heading in headings.iter().take_while(|h| h.start <= offset) {
        while open.last().is_some_and(|o| o.level >= heading.level) {
            open.pop();
        }
        open.push(heading);
    }
    open.into_iter().map(|h| h.title.clone()).collect()
}

/// Fills section path, list and code markers, word count and set size.
pub(crate) fn annotate(document: &Document, set: &mut ChunkSet) {
    let headings = headings(document);
    let kinds: Vec<NodeKind> = document.walk().into_iter().map(|(_, _, node)| node.kind).collect();
    let refers_to = |refs: &[usize], kind: NodeKind| refs.iter().any(|&id| kinds.get(id) == Some(&kind));

    let total = set.chunks.len();
    for chunk in &mut set.chunks {
        let has_list = refers_to(&chunk.node_refs, NodeKind::ListItem) || list_marker().is_match(&chunk.content);
        let has_code = refers_to(&chunk.node_refs, NodeKind::CodeBlock) || chunk.content.contains("```");
        let meta = &mut chunk.metadata;
        meta.section_path = section_path(&headings, chunk.byte_range.start);
        meta.has_list = has_list;
        meta.has_code = has_code;
        meta.word_count = chunk.content.split_whitespace().count();
        meta.total_chunks = total;
    }
}
