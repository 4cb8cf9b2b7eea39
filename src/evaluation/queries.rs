//! Labeled queries with ground truth.
//!
//! ## Query File Format (JSON)
//!
//! ```json
//! {
//!   "metadata": { "name": "handbook", "version": "1.0" },
//!   "documents": {
//!     "dosage": [
//!       { "query": "kidney disease dosage", "expected": { "answer": "should not take" } },
//!       { "query": "storage temperature", "expected": { "offset": 182 } },
//!       { "query": "side effects", "expected": { "index": 2 } }
//!     ]
//!   }
//! }
//! ```
//!
//! An expected chunk is either a chunk index, an answer text the chunk
//! must contain, or a byte offset the chunk must cover. Answer text and
//! offsets identify the same passage whichever strategy produced the
//! chunks; indices only make sense for one strategy.

use crate::core::Chunk;
use crate::error::Result;
use crate::text::normalize_whitespace;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Identifies the chunk that should answer a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedChunk {
    /// The chunk with this index.
    Index(usize),
    /// Any chunk containing this text (whitespace-insensitive).
    Answer(String),
    /// Any chunk whose span covers this byte offset.
    Offset(usize),
}

impl ExpectedChunk {
    /// Returns true if `chunk` satisfies this expectation.
    ///
    /// # Examples
    ///
    /// ```
    /// use chunkbench::core::Chunk;
    /// use chunkbench::evaluation::ExpectedChunk;
    ///
    /// let chunk = Chunk::new(0, "store at room\ntemperature".to_string(), 0..25, 4);
    /// assert!(ExpectedChunk::Answer("room temperature".to_string()).matches(&chunk));
    /// assert!(ExpectedChunk::Offset(3).matches(&chunk));
    /// assert!(!ExpectedChunk::Index(1).matches(&chunk));
    /// ```
    #[must_use]
    pub fn matches(&self, chunk: &Chunk) -> bool {
        match self {
            Self::Index(index) => chunk.index == *index,
            Self::Answer(answer) => {
                let answer = normalize_whitespace(answer);
                !answer.is_empty() && normalize_whitespace(&chunk.content).contains(&answer)
            }
            Self::Offset(offset) => chunk.contains_offset(*offset),
        }
    }
}

/// A query paired with the chunk expected to answer it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledQuery {
    /// Query text.
    pub query: String,
    /// Ground truth.
    pub expected: ExpectedChunk,
    /// What the query is testing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl LabeledQuery {
    /// Creates a query.
    pub fn new(query: impl Into<String>, expected: ExpectedChunk) -> Self {
        Self {
            query: query.into(),
            expected,
            description: None,
        }
    }

    /// Creates a query answered by the chunk containing `answer`.
    pub fn answer(query: impl Into<String>, answer: impl Into<String>) -> Self {
        Self::new(query, ExpectedChunk::Answer(answer.into()))
    }
}

/// Metadata about a query set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySetMetadata {
    /// Set name.
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: String,
    /// Version string.
    #[serde(default)]
    pub version: String,
}

/// Labeled queries grouped by document id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySet {
    /// Optional metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<QuerySetMetadata>,
    /// Queries per document id.
    #[serde(default)]
    pub documents: BTreeMap<String, Vec<LabeledQuery>>,
}

impl QuerySet {
    /// Creates an empty query set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a query for `document_id`.
    pub fn insert(&mut self, document_id: impl Into<String>, query: LabeledQuery) {
        self.documents.entry(document_id.into()).or_default().push(query);
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with_query(mut self, document_id: impl Into<String>, query: LabeledQuery) -> Self {
        self.insert(document_id, query);
        self
    }

    /// Queries for one document, if any were labeled.
    #[must_use]
    pub fn for_document(&self, document_id: &str) -> Option<&[LabeledQuery]> {
        self.documents
            .get(document_id)
            .map(Vec::as_slice)
            .filter(|queries| !queries.is_empty())
    }

    /// Total number of queries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.values().map(Vec::len).sum()
    }

    /// Returns true if there are no queries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Parses a query set from JSON.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the JSON is malformed.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes the query set to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Loads a query set from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read, or a serialization
    /// error if it is malformed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Saves the query set as JSON.
    ///
    /// # Errors
    ///
    /// Returns an I/O or serialization error.
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Draws up to `per_document` queries from each document with a seeded
    /// RNG. Selected queries keep their original order.
    ///
    /// The same seed always selects the same queries.
    #[must_use]
    pub fn sample(&self, per_document: usize, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let documents = self
            .documents
            .iter()
            .map(|(id, queries)| {
                let amount = per_document.min(queries.len());
                let mut picked = rand::seq::index::sample(&mut rng, queries.len(), amount).into_vec();
                picked.sort_unstable();
                let selected = picked.into_iter().map(|i| queries[i].clone()).collect();
                (id.clone(), selected)
            })
            .collect();

        Self {
            metadata: self.metadata.clone(),
            documents,
        }
    }
}
