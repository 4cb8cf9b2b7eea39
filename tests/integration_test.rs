//! Integration tests for chunkbench.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use chunkbench::benchmark::{BenchmarkConfig, BenchmarkSuite, StrategySpec};
use chunkbench::chunking::{SplitContext, Strategy, StrategyConfig, split};
use chunkbench::core::{Document, DocumentFormat, NodeKind, StructuralNode};
use chunkbench::embedding::{Embedder, EmbeddingResult, HashEmbedder};
use chunkbench::error::{EmbeddingError, ErrorKind};
use chunkbench::evaluation::{EvaluationConfig, LabeledQuery, QuerySet};
use chunkbench::pipeline::{Batch, MonitoringHook, Pipeline, PipelineEvent, RawDocument};
use chunkbench::tokenizer::{CharTokenizer, Tokenizer, WordTokenizer};
use std::sync::{Arc, Mutex};

const ARTICLE: &str = "Rust programs are compiled ahead of time. The compiler checks ownership \
and borrowing rules. Memory safety follows without a garbage collector.\n\n\
Tea is grown on hillsides in warm climates. Leaves are picked, withered and dried. \
Green tea skips the oxidation step.\n\n\
Trains connect cities across the continent. High-speed lines reach three hundred \
kilometres per hour.";

/// Embedder whose every call times out.
struct TimingOut;

impl Embedder for TimingOut {
    fn dimensions(&self) -> usize {
        16
    }

    fn embed(&self, _text: &str) -> EmbeddingResult<Vec<f32>> {
        Err(EmbeddingError::Timeout { after_ms: 30_000 })
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("chunkbench=debug")
        .try_init();
}

fn article() -> Document {
    Document::from_text("article", ARTICLE)
}

fn split_with(
    strategy: Strategy,
    config: StrategyConfig,
    doc: &Document,
    tokenizer: &dyn Tokenizer,
) -> chunkbench::ChunkSet {
    let embedder = HashEmbedder::default();
    let ctx = SplitContext::new(tokenizer).with_embedder(&embedder);
    split(doc, &config.with_strategy(strategy), &ctx).expect("split failed")
}

#[test]
fn test_every_strategy_orders_and_covers() {
    let doc = article();
    for strategy in Strategy::ALL {
        let config = if strategy == Strategy::Overlap {
            StrategyConfig::new(12).with_overlap(3)
        } else {
            StrategyConfig::new(12)
        };
        let set = split_with(strategy, config, &doc, &WordTokenizer);

        assert!(!set.is_empty(), "{strategy} produced nothing");
        assert!(set.is_ordered(), "{strategy} out of order");
        assert!(set.chunks.iter().all(|c| !c.content.trim().is_empty()));
        for (i, chunk) in set.chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
            assert_eq!(&ARTICLE[chunk.byte_range.clone()], chunk.content);
        }
        if strategy != Strategy::Overlap {
            for gap in set.uncovered_ranges(ARTICLE) {
                assert!(
                    ARTICLE[gap.clone()].trim().is_empty(),
                    "{strategy} dropped {:?}",
                    &ARTICLE[gap]
                );
            }
        }
    }
}

#[test]
fn test_budget_respected_unless_flagged() {
    let doc = article();
    for strategy in Strategy::ALL {
        let config = if strategy == Strategy::Overlap {
            StrategyConfig::new(10).with_overlap(2)
        } else {
            StrategyConfig::new(10)
        };
        let set = split_with(strategy, config, &doc, &WordTokenizer);
        for chunk in &set.chunks {
            assert!(
                chunk.token_count <= 10 || chunk.is_oversized(),
                "{strategy}: {} tokens in {:?}",
                chunk.token_count,
                chunk.content
            );
        }
    }
}

#[test]
fn test_paragraph_scenario_budget_outranks_two_chunks() {
    let doc = Document::from_text("p", "Paragraph A sentence one. Sentence two.\n\nParagraph B.");
    let config = StrategyConfig::for_strategy(Strategy::Paragraph, 20);
    let set = split(&doc, &config, &SplitContext::new(&CharTokenizer)).unwrap();

    let contents: Vec<&str> = set.iter().map(|c| c.content.as_str()).collect();
    // Two chunks would need paragraph A whole, at 39 characters. The budget
    // wins: paragraph A falls back to sentences, and its first sentence
    // alone is 25 characters and is emitted flagged.
    assert_eq!(contents, vec!["Paragraph A sentence one.", "Sentence two.", "Paragraph B."]);
    assert_eq!(set.oversized_count(), 1);
    assert!(set.chunks[0].is_oversized());
}

#[test]
fn test_hierarchy_table_scenario() {
    let intro = "Quarterly numbers follow.";
    let table = "cell ".repeat(500);
    let table = table.trim_end();
    let text = format!("{intro}\n\n{table}");
    let table_start = intro.len() + 2;
    let doc = Document::with_nodes(
        "report",
        text.clone(),
        DocumentFormat::Markdown,
        vec![
            StructuralNode::paragraph(0..intro.len()),
            StructuralNode::table(table_start..text.len()),
        ],
    );

    let config = StrategyConfig::for_strategy(Strategy::Hierarchy, 100);
    let set = split(&doc, &config, &SplitContext::new(&WordTokenizer)).unwrap();

    let flagged: Vec<_> = set.iter().filter(|c| c.is_oversized()).collect();
    assert_eq!(flagged.len(), 1);
    assert_eq!(flagged[0].content, table);
    assert_eq!(flagged[0].token_count, 500);
    assert_eq!(flagged[0].byte_range, table_start..text.len());
    assert!(flagged[0].node_refs.contains(&1));
    assert_eq!(doc.nodes[1].kind, NodeKind::Table);
}

#[test]
fn test_semantic_timeout_matches_paragraph_output() {
    init_tracing();
    let doc = article();
    let semantic_config = StrategyConfig::for_strategy(Strategy::Semantic, 20);
    let paragraph_config = StrategyConfig::for_strategy(Strategy::Paragraph, 20);

    let degraded = split(
        &doc,
        &semantic_config,
        &SplitContext::new(&WordTokenizer).with_embedder(&TimingOut),
    )
    .unwrap();
    let paragraph = split(&doc, &paragraph_config, &SplitContext::new(&WordTokenizer)).unwrap();

    assert_eq!(degraded.chunks, paragraph.chunks);
    assert_eq!(degraded.degradations.len(), 1);
    let event = &degraded.degradations[0];
    assert_eq!(event.from, "semantic");
    assert_eq!(event.to, "paragraph");
    assert_eq!(event.kind, ErrorKind::EmbeddingServiceUnavailable);
    assert!(event.reason.contains("timed out"));
}

#[test]
fn test_recursive_terminates_on_huge_word() {
    let word = "a".repeat(100_000);
    let doc = Document::from_text("word", word.clone());

    let chars = split(
        &doc,
        &StrategyConfig::for_strategy(Strategy::Recursive, 1_000),
        &SplitContext::new(&CharTokenizer),
    )
    .unwrap();
    assert_eq!(chars.len(), 100);
    assert!(chars.iter().all(|c| !c.is_empty() && c.token_count == 1_000));
    assert_eq!(chars.iter().map(|c| c.content.as_str()).collect::<String>(), word);

    let words = split(
        &doc,
        &StrategyConfig::for_strategy(Strategy::Recursive, 50),
        &SplitContext::new(&WordTokenizer),
    )
    .unwrap();
    assert_eq!(words.len(), 1);
    assert_eq!(words.chunks[0].token_count, 1);
}

#[test]
fn test_benchmark_is_deterministic() {
    let docs = vec![
        article(),
        Document::from_text("short", "A single short note about tea."),
    ];
    let queries = QuerySet::new()
        .with_query("article", LabeledQuery::answer("how is green tea made", "Green tea skips"))
        .with_query("article", LabeledQuery::answer("compiler ownership rules", "ownership"))
        .with_query("article", LabeledQuery::answer("fast trains", "High-speed lines"))
        .with_query("short", LabeledQuery::answer("note about tea", "short note"));

    let embedder = HashEmbedder::default();
    let run = || {
        let config = BenchmarkConfig::all_strategies(16)
            .evaluation(EvaluationConfig::default().record_resources(false))
            .query_sample(2)
            .seed(1234);
        BenchmarkSuite::new(config, &WordTokenizer, &embedder)
            .run(&docs, Some(&queries))
            .unwrap()
    };

    let first = run();
    let second = run();
    assert_eq!(first, second);
    assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
    assert_eq!(first.strategies.len(), Strategy::ALL.len());
    assert!(first.failures.is_empty());
    assert!(first.best_strategy().is_some());
    assert!(first.render_text().contains("rank"));
}

#[test]
fn test_benchmark_compares_budgets() {
    let embedder = HashEmbedder::default();
    let config = BenchmarkConfig::default()
        .with_strategy(StrategySpec::new("fixed-8", StrategyConfig::for_strategy(Strategy::Fixed, 8)))
        .with_strategy(StrategySpec::new("fixed-64", StrategyConfig::for_strategy(Strategy::Fixed, 64)))
        .evaluation(EvaluationConfig::default().record_resources(false));
    let report = BenchmarkSuite::new(config, &WordTokenizer, &embedder)
        .run(&[article()], None)
        .unwrap();

    let small = &report.strategies["fixed-8"];
    let large = &report.strategies["fixed-64"];
    assert!(small.chunk_count.mean.unwrap() > large.chunk_count.mean.unwrap());
    assert_eq!(small.retrieval_accuracy.mean, None);
    assert_eq!(report.ranking.len(), 2);
}

#[derive(Default)]
struct EventLog(Mutex<Vec<PipelineEvent>>);

impl MonitoringHook for EventLog {
    fn on_event(&self, event: &PipelineEvent) {
        self.0.lock().unwrap().push(event.clone());
    }
}

#[tokio::test]
async fn test_pipeline_isolates_parse_failure() {
    init_tracing();
    let mut batch = Batch::new("nightly");
    for i in 1..=5 {
        if i == 3 {
            batch.push(RawDocument::new(
                "doc-3",
                vec![0xc3, 0x28, b'a'],
                DocumentFormat::PlainText,
            ));
        } else {
            batch.push(RawDocument::text(format!("doc-{i}"), ARTICLE));
        }
    }

    let log = Arc::new(EventLog::default());
    let pipeline = Pipeline::new(StrategyConfig::new(32), Arc::new(WordTokenizer)).with_hook(log.clone());
    let run = pipeline.process(batch).await.unwrap();

    assert_eq!(run.succeeded(), 4);
    assert_eq!(run.failed(), 1);
    let failed = run.outcome("doc-3").unwrap();
    assert_eq!(failed.error_kind(), Some(ErrorKind::ParseFailure));
    assert_eq!(failed.attempts, 1);
    assert!(run.outcome("doc-1").unwrap().chunk_count() > 0);

    let events = log.0.lock().unwrap();
    let completed: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, PipelineEvent::BatchCompleted { .. }))
        .collect();
    assert_eq!(completed.len(), 1);
    assert!(matches!(
        completed[0],
        PipelineEvent::BatchCompleted { succeeded: 4, failed: 1, cancelled: false, .. }
    ));
    assert!(matches!(events.last(), Some(PipelineEvent::BatchCompleted { .. })));
}

mod property_tests {
    use super::*;
    use chunkbench::chunking::Strategy;
    use proptest::prelude::*;
    use proptest::strategy::Strategy as _;

    fn prose() -> impl proptest::strategy::Strategy<Value = String> {
        proptest::collection::vec("[a-z]{1,8}( [a-z]{1,8}){0,12}\\.", 1..12).prop_map(|sentences| {
            sentences
                .chunks(3)
                .map(|p| p.join(" "))
                .collect::<Vec<_>>()
                .join("\n\n")
        })
    }

    /// Markdown sections with paragraph, list item and table children,
    /// spans laid out in source order.
    fn sectioned() -> impl proptest::strategy::Strategy<Value = Document> {
        let body = "([a-z]{1,8}( [a-z]{1,8}){0,10}\\. ){0,3}[a-z]{1,8}( [a-z]{1,8}){0,10}\\.";
        let child = (0usize..3, body);
        let section = (1u8..=4, "[A-Z][a-z]{1,8}", proptest::collection::vec(child, 0..4));
        proptest::collection::vec(section, 1..6).prop_map(|sections| {
            let mut text = String::new();
            let mut nodes = Vec::new();
            for (level, title, children) in sections {
                if !text.is_empty() {
                    text.push_str("\n\n");
                }
                let start = text.len();
                text.push_str(&format!("{} {title}", "#".repeat(usize::from(level))));
                let mut kids = Vec::new();
                for (kind, body) in children {
                    text.push_str("\n\n");
                    let child_start = text.len();
                    let (kind, line) = match kind {
                        0 => (NodeKind::Paragraph, body),
                        1 => (NodeKind::ListItem, format!("- {body}")),
                        _ => (NodeKind::Table, format!("| {body} |")),
                    };
                    text.push_str(&line);
                    kids.push(StructuralNode::new(kind, child_start..text.len()));
                }
                nodes.push(StructuralNode::heading(level, start..text.len()).with_children(kids));
            }
            Document::with_nodes("tree", text, DocumentFormat::Markdown, nodes)
        })
    }

    proptest! {
        #[test]
        fn hierarchy_keeps_sections_apart(doc in sectioned(), size in 4usize..40, heading_level in 1u8..=3) {
            prop_assert!(doc.validate().is_ok());
            let config = StrategyConfig::new(size).heading_level(heading_level);
            let set = split_with(Strategy::Hierarchy, config, &doc, &WordTokenizer);

            prop_assert!(set.is_ordered());
            for chunk in &set.chunks {
                prop_assert!(chunk.token_count <= size || chunk.is_oversized());
                prop_assert!(!chunk.content.trim().is_empty());
            }
            for gap in set.uncovered_ranges(&doc.text) {
                prop_assert!(doc.text[gap].trim().is_empty());
            }
            for heading in doc.nodes.iter().filter(|n| n.level.is_some_and(|l| l <= heading_level)) {
                let at = heading.span.start;
                prop_assert!(
                    set.iter().all(|c| !(c.start() < at && at < c.byte_range.end)),
                    "a chunk straddles the heading at byte {}", at
                );
            }
        }

        #[test]
        fn chunks_ordered_within_budget(text in prose(), size in 4usize..40) {
            let doc = Document::from_text("p", text.clone());
            for strategy in Strategy::ALL {
                let config = match strategy {
                    Strategy::Overlap => StrategyConfig::new(size).with_overlap((size / 4).max(1)),
                    _ => StrategyConfig::new(size),
                };
                let set = split_with(strategy, config, &doc, &WordTokenizer);
                prop_assert!(set.is_ordered());
                for chunk in &set.chunks {
                    prop_assert!(chunk.token_count <= size || chunk.is_oversized());
                    prop_assert!(!chunk.content.trim().is_empty());
                }
                for gap in set.uncovered_ranges(&text) {
                    prop_assert!(text[gap].trim().is_empty());
                }
            }
        }

        #[test]
        fn overlap_tokens_match(text in "[a-z]{10,300}", size in 3usize..30, overlap_frac in 1usize..3) {
            let overlap = (size * overlap_frac / 3).clamp(1, size - 1);
            let doc = Document::from_text("o", text);
            let config = StrategyConfig::for_strategy(Strategy::Overlap, size).with_overlap(overlap);
            let set = split(&doc, &config, &SplitContext::new(&CharTokenizer)).unwrap();

            for pair in set.chunks.windows(2) {
                let prev: Vec<char> = pair[0].content.chars().collect();
                let next: Vec<char> = pair[1].content.chars().collect();
                prop_assert_eq!(&prev[prev.len() - overlap..], &next[..overlap]);
            }
        }

        #[test]
        fn recursive_never_empty(word_len in 1usize..5_000, size in 1usize..200) {
            let doc = Document::from_text("w", "z".repeat(word_len));
            let config = StrategyConfig::for_strategy(Strategy::Recursive, size);
            let set = split(&doc, &config, &SplitContext::new(&CharTokenizer)).unwrap();
            prop_assert!(!set.is_empty());
            prop_assert!(set.chunks.iter().all(|c| !c.is_empty() && c.token_count <= size));
            prop_assert_eq!(set.total_tokens(), word_len);
        }
    }
}
