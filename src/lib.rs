//! # chunkbench
//!
//! Chunking strategy engine and evaluation harness for retrieval-augmented
//! generation.
//!
//! chunkbench splits documents into token-bounded chunks with one of
//! several interchangeable strategies, scores the result on coherence,
//! retrieval accuracy and token efficiency, and compares strategies across
//! a document set. The same splitters run in a concurrent batch pipeline
//! with retries, cancellation and monitoring hooks.
//!
//! ## Features
//!
//! - **Strategies**: fixed, overlap, sentence, paragraph, hierarchy,
//!   semantic and recursive splitting behind one entry point
//! - **Evaluation**: per-document metrics plus chunk-quality diagnostics
//! - **Benchmarking**: parallel, deterministic strategy comparison with
//!   aggregated and ranked reports
//! - **Pipeline**: bounded-concurrency batch processing with bounded
//!   exponential-backoff retries
//! - **Unicode Aware**: spans always fall on character boundaries
//!
//! ## Example
//!
//! ```
//! use chunkbench::chunking::{split, SplitContext, Strategy, StrategyConfig};
//! use chunkbench::core::Document;
//! use chunkbench::tokenizer::WordTokenizer;
//!
//! let doc = Document::from_text("intro", "First idea.\n\nSecond idea.");
//! let config = StrategyConfig::for_strategy(Strategy::Paragraph, 8);
//! let set = split(&doc, &config, &SplitContext::new(&WordTokenizer)).unwrap();
//! assert_eq!(set.len(), 2);
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![warn(unsafe_code)]

pub mod benchmark;
pub mod chunking;
pub mod config;
pub mod core;
pub mod embedding;
pub mod error;
pub mod evaluation;
pub mod parser;
pub mod pipeline;
pub mod retry;
pub mod text;
pub mod tokenizer;

// Re-export commonly used types at crate root
pub use error::{Error, ErrorKind, Result};

// Re-export core domain types
pub use core::{Chunk, ChunkFlag, ChunkMetadata, ChunkSet, DegradationEvent, Document, StructuralNode};

// Re-export chunking types
pub use chunking::{SplitContext, Strategy, StrategyConfig, available_strategies, split};

// Re-export tokenizer types
pub use tokenizer::{SharedTokenizer, Tokenizer, available_tokenizers, create_tokenizer};

// Re-export embedding types
#[cfg(feature = "fastembed-embeddings")]
pub use embedding::FastEmbedEmbedder;
pub use embedding::{
    DEFAULT_DIMENSIONS, Embedder, HashEmbedder, SharedEmbedder, cosine_similarity, create_embedder,
};

// Re-export evaluation and benchmark types
pub use benchmark::{BenchmarkConfig, BenchmarkSuite, ComparisonReport, StrategySpec};
pub use evaluation::{EvaluationConfig, LabeledQuery, MetricResult, MetricsEngine, QuerySet};

// Re-export pipeline types
pub use config::Settings;
pub use parser::{PlainTextParser, StructuralParser};
pub use pipeline::{Batch, CancellationHandle, Pipeline, PipelineConfig, PipelineRun, RawDocument};
pub use retry::RetryPolicy;
