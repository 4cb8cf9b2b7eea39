//! Batch run records.

use crate::core::ChunkSet;
use crate::error::{Error, ErrorKind, PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Final state of one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Chunked successfully.
    Succeeded,
    /// Failed after all allowed attempts.
    Failed,
    /// Never dispatched because the batch was cancelled.
    Cancelled,
}

/// Error recorded for a failed document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeError {
    /// Error classification.
    pub kind: ErrorKind,
    /// Error message.
    pub reason: String,
}

impl From<&Error> for OutcomeError {
    fn from(err: &Error) -> Self {
        Self {
            kind: err.kind(),
            reason: err.to_string(),
        }
    }
}

/// Output of a successfully processed document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedDocument {
    /// Produced chunks.
    pub chunks: ChunkSet,
    /// One embedding per chunk, empty unless chunk embedding is enabled.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embeddings: Vec<Vec<f32>>,
}

/// Outcome of one document in a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentOutcome {
    /// Document identifier.
    pub document_id: String,
    /// Final state.
    pub status: OutcomeStatus,
    /// Attempts made (0 if never dispatched).
    pub attempts: u32,
    /// Failure details, for failed and cancelled documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<OutcomeError>,
    /// Output, for succeeded documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<ProcessedDocument>,
}

impl DocumentOutcome {
    /// Creates a success outcome.
    #[must_use]
    pub fn succeeded(document_id: impl Into<String>, attempts: u32, output: ProcessedDocument) -> Self {
        Self {
            document_id: document_id.into(),
            status: OutcomeStatus::Succeeded,
            attempts,
            error: None,
            output: Some(output),
        }
    }

    /// Creates a failure outcome.
    #[must_use]
    pub fn failed(document_id: impl Into<String>, attempts: u32, err: &Error) -> Self {
        Self {
            document_id: document_id.into(),
            status: OutcomeStatus::Failed,
            attempts,
            error: Some(err.into()),
            output: None,
        }
    }

    /// Creates an outcome for a document that was never dispatched.
    #[must_use]
    pub fn cancelled(document_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            status: OutcomeStatus::Cancelled,
            attempts: 0,
            error: Some(OutcomeError::from(&Error::from(PipelineError::Cancelled))),
            output: None,
        }
    }

    /// Returns true if the document succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Succeeded
    }

    /// Number of chunks produced, 0 unless succeeded.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.output.as_ref().map_or(0, |o| o.chunks.len())
    }

    /// Error classification, if the document did not succeed.
    #[must_use]
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }
}

/// Record of one batch run, keyed by document id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRun {
    /// Unique identifier of this run.
    pub run_id: String,
    /// Batch identifier.
    pub batch_id: String,
    /// Outcome of every document in the batch.
    pub outcomes: BTreeMap<String, DocumentOutcome>,
    /// Wall-clock duration of the run.
    pub duration_ms: u64,
    /// Whether cancellation was requested during the run.
    pub cancelled: bool,
}

impl PipelineRun {
    /// Number of succeeded documents.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.count(OutcomeStatus::Succeeded)
    }

    /// Number of failed documents.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(OutcomeStatus::Failed)
    }

    /// Number of documents never dispatched.
    #[must_use]
    pub fn cancelled_count(&self) -> usize {
        self.count(OutcomeStatus::Cancelled)
    }

    fn count(&self, status: OutcomeStatus) -> usize {
        self.outcomes.values().filter(|o| o.status == status).count()
    }

    /// Outcome of one document.
    #[must_use]
    pub fn outcome(&self, document_id: &str) -> Option<&DocumentOutcome> {
        self.outcomes.get(document_id)
    }

    /// Total chunks produced by the batch.
    #[must_use]
    pub fn total_chunks(&self) -> usize {
        self.outcomes.values().map(DocumentOutcome::chunk_count).sum()
    }

    /// Serializes the run to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
