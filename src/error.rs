//! Error types for chunking, evaluation and pipeline operations.
//!
//! Errors are organized as a `thiserror` hierarchy. Every error can be
//! classified into an [`ErrorKind`], which is what benchmark reports and
//! pipeline runs record, and what the retry policy inspects.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for crate operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Chunking errors (configuration and splitting).
    #[error("chunking error: {0}")]
    Chunking(#[from] ChunkingError),

    /// Embedding service errors.
    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// Structural parsing errors.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Pipeline orchestration errors.
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// I/O errors (config and query files).
    #[error("I/O error: {0}")]
    Io(String),

    /// Serialization errors (reports, query sets).
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Configuration errors.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },
}

/// Classification of an error, as recorded in reports and pipeline runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// An indivisible unit exceeded the token budget.
    OversizedAtomicUnit,
    /// The embedding service timed out, was rate limited or unreachable.
    EmbeddingServiceUnavailable,
    /// The document could not be parsed.
    ParseFailure,
    /// The configuration was rejected before processing.
    ConfigurationInvalid,
    /// Processing was cancelled before the document was dispatched.
    Cancelled,
    /// Anything else (worker crash, serialization, I/O).
    Internal,
}

impl ErrorKind {
    /// Returns the snake-case name used in reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OversizedAtomicUnit => "oversized_atomic_unit",
            Self::EmbeddingServiceUnavailable => "embedding_service_unavailable",
            Self::ParseFailure => "parse_failure",
            Self::ConfigurationInvalid => "configuration_invalid",
            Self::Cancelled => "cancelled",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Classifies this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Chunking(e) => e.kind(),
            Self::Embedding(_) => ErrorKind::EmbeddingServiceUnavailable,
            Self::Parse(_) => ErrorKind::ParseFailure,
            Self::Pipeline(e) => e.kind(),
            Self::Config { .. } => ErrorKind::ConfigurationInvalid,
            Self::Io(_) | Self::Serialization(_) => ErrorKind::Internal,
        }
    }

    /// Returns true if retrying the failed operation may succeed.
    ///
    /// Only external-service failures are transient; parse and
    /// configuration errors never are.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Embedding(e) => e.is_transient(),
            _ => false,
        }
    }
}

/// Chunking-specific errors.
#[derive(Error, Debug)]
pub enum ChunkingError {
    /// Chunk size exceeds maximum allowed.
    #[error("chunk size {size} exceeds maximum {max}")]
    ChunkTooLarge {
        /// Requested chunk size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Invalid chunk configuration.
    #[error("invalid chunk configuration: {reason}")]
    InvalidConfig {
        /// Reason the configuration is invalid.
        reason: String,
    },

    /// Overlap exceeds chunk size.
    #[error("overlap {overlap} must be less than chunk size {size}")]
    OverlapTooLarge {
        /// Overlap size.
        overlap: usize,
        /// Chunk size.
        size: usize,
    },

    /// Unknown chunking strategy.
    #[error("unknown chunking strategy: {name}")]
    UnknownStrategy {
        /// Name of the unknown strategy.
        name: String,
    },

    /// An atomic unit exceeded the budget and oversized chunks are rejected.
    #[error("atomic unit of {tokens} tokens at bytes {start}..{end} exceeds budget {budget}")]
    OversizedAtomicUnit {
        /// Token count of the unit.
        tokens: usize,
        /// Configured budget.
        budget: usize,
        /// Start byte offset.
        start: usize,
        /// End byte offset.
        end: usize,
    },

    /// A structural node span does not fit the source text.
    #[error("node span {start}..{end} is invalid for text of {len} bytes")]
    InvalidSpan {
        /// Start byte offset.
        start: usize,
        /// End byte offset.
        end: usize,
        /// Length of the source text.
        len: usize,
    },
}

impl ChunkingError {
    /// Classifies this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::OversizedAtomicUnit { .. } => ErrorKind::OversizedAtomicUnit,
            Self::InvalidSpan { .. } => ErrorKind::ParseFailure,
            Self::ChunkTooLarge { .. }
            | Self::InvalidConfig { .. }
            | Self::OverlapTooLarge { .. }
            | Self::UnknownStrategy { .. } => ErrorKind::ConfigurationInvalid,
        }
    }
}

/// Errors raised by an embedding service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EmbeddingError {
    /// The service did not answer in time.
    #[error("embedding request timed out after {after_ms}ms")]
    Timeout {
        /// Elapsed time before giving up.
        after_ms: u64,
    },

    /// The service rejected the request due to rate limiting.
    #[error("rate limited{}", retry_suffix(.retry_after_ms))]
    RateLimited {
        /// Suggested wait before retrying.
        retry_after_ms: Option<u64>,
    },

    /// The service could not be reached.
    #[error("embedding service unavailable: {0}")]
    Unavailable(String),

    /// The input cannot be embedded (empty text, for instance).
    #[error("invalid embedding input: {0}")]
    InvalidInput(String),

    /// The model failed while producing an embedding.
    #[error("embedding backend failed: {0}")]
    Backend(String),
}

fn retry_suffix(retry_after_ms: &Option<u64>) -> String {
    retry_after_ms
        .map(|ms| format!(", retry after {ms}ms"))
        .unwrap_or_default()
}

impl EmbeddingError {
    /// Returns true for timeouts, rate limits and connection failures.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::RateLimited { .. } | Self::Unavailable(_)
        )
    }
}

/// Structural parsing errors.
#[derive(Error, Debug)]
pub enum ParseError {
    /// Invalid UTF-8 encountered at specific byte offset.
    #[error("invalid UTF-8 at byte offset {offset}")]
    InvalidUtf8 {
        /// Byte offset where invalid UTF-8 was found.
        offset: usize,
    },

    /// The parser does not handle this format.
    #[error("unsupported document format: {format}")]
    UnsupportedFormat {
        /// Name of the format.
        format: String,
    },

    /// The input is structurally broken.
    #[error("malformed document {document}: {reason}")]
    Malformed {
        /// Document identifier.
        document: String,
        /// What was wrong.
        reason: String,
    },
}

/// Pipeline orchestration errors.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The batch was cancelled before the document was dispatched.
    #[error("processing cancelled")]
    Cancelled,

    /// A worker task panicked or was aborted.
    #[error("worker failed: {reason}")]
    WorkerFailed {
        /// Reason for failure.
        reason: String,
    },

    /// Two documents in a batch share an identifier.
    #[error("duplicate document id in batch: {id}")]
    DuplicateDocument {
        /// The repeated identifier.
        id: String,
    },
}

impl PipelineError {
    /// Classifies this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Cancelled => ErrorKind::Cancelled,
            Self::WorkerFailed { .. } => ErrorKind::Internal,
            Self::DuplicateDocument { .. } => ErrorKind::ConfigurationInvalid,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Config {
            message: err.to_string(),
        }
    }
}

impl From<std::str::Utf8Error> for ParseError {
    fn from(err: std::str::Utf8Error) -> Self {
        Self::InvalidUtf8 {
            offset: err.valid_up_to(),
        }
    }
}

impl From<std::string::FromUtf8Error> for ParseError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Self::InvalidUtf8 {
            offset: err.utf8_error().valid_up_to(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_config() {
        let err = Error::config("bad config");
        assert_eq!(err.to_string(), "configuration error: bad config");
        assert_eq!(err.kind(), ErrorKind::ConfigurationInvalid);
    }

    #[test]
    fn test_chunking_error_display() {
        let err = ChunkingError::OverlapTooLarge {
            overlap: 100,
            size: 50,
        };
        assert_eq!(
            err.to_string(),
            "overlap 100 must be less than chunk size 50"
        );

        let err = ChunkingError::OversizedAtomicUnit {
            tokens: 500,
            budget: 100,
            start: 10,
            end: 2000,
        };
        assert_eq!(
            err.to_string(),
            "atomic unit of 500 tokens at bytes 10..2000 exceeds budget 100"
        );
    }

    #[test]
    fn test_chunking_error_kinds() {
        let err = ChunkingError::UnknownStrategy {
            name: "foobar".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::ConfigurationInvalid);

        let err = ChunkingError::InvalidSpan {
            start: 5,
            end: 50,
            len: 10,
        };
        assert_eq!(err.kind(), ErrorKind::ParseFailure);
    }

    #[test]
    fn test_rate_limited_display() {
        let err = EmbeddingError::RateLimited {
            retry_after_ms: Some(250),
        };
        assert_eq!(err.to_string(), "rate limited, retry after 250ms");

        let err = EmbeddingError::RateLimited {
            retry_after_ms: None,
        };
        assert_eq!(err.to_string(), "rate limited");
    }

    #[test]
    fn test_transient_classification() {
        let timeout: Error = EmbeddingError::Timeout { after_ms: 30 }.into();
        assert!(timeout.is_transient());
        assert_eq!(timeout.kind(), ErrorKind::EmbeddingServiceUnavailable);

        let backend: Error = EmbeddingError::Backend("onnx".to_string()).into();
        assert!(!backend.is_transient());

        let parse: Error = ParseError::InvalidUtf8 { offset: 3 }.into();
        assert!(!parse.is_transient());
        assert_eq!(parse.kind(), ErrorKind::ParseFailure);

        assert!(!Error::config("x").is_transient());
    }

    #[test]
    fn test_pipeline_error_kinds() {
        assert_eq!(PipelineError::Cancelled.kind(), ErrorKind::Cancelled);
        let err: Error = PipelineError::DuplicateDocument {
            id: "a".to_string(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::ConfigurationInvalid);
        assert_eq!(err.to_string(), "pipeline error: duplicate document id in batch: a");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_from_str_utf8_error_to_parse_error() {
        let invalid_bytes: Vec<u8> = vec![b'o', b'k', 0xff, 0xfe];
        let utf8_err = std::str::from_utf8(&invalid_bytes).unwrap_err();
        let err: ParseError = utf8_err.into();
        assert!(matches!(err, ParseError::InvalidUtf8 { offset: 2 }));
    }

    #[test]
    fn test_from_toml_error_is_config() {
        let toml_err = toml::from_str::<toml::Value>("= nope").unwrap_err();
        let err: Error = toml_err.into();
        assert_eq!(err.kind(), ErrorKind::ConfigurationInvalid);
    }

    #[test]
    fn test_error_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::EmbeddingServiceUnavailable).unwrap();
        assert_eq!(json, "\"embedding_service_unavailable\"");
        assert_eq!(ErrorKind::ParseFailure.to_string(), "parse_failure");
    }
}
