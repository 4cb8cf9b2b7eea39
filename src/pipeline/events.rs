//! Monitoring event contract.
//!
//! The pipeline reports progress through a [`MonitoringHook`]. Wiring the
//! events to an external monitoring system is left to the hook.

use crate::error::ErrorKind;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Progress event emitted by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// A document attempt is starting.
    DocumentStarted {
        /// Batch identifier.
        batch_id: String,
        /// Document identifier.
        document_id: String,
        /// Attempt number (1-based).
        attempt: u32,
    },
    /// A document was chunked.
    DocumentSucceeded {
        /// Batch identifier.
        batch_id: String,
        /// Document identifier.
        document_id: String,
        /// Chunks produced.
        chunk_count: usize,
        /// Attempts made.
        attempts: u32,
    },
    /// A document failed permanently.
    DocumentFailed {
        /// Batch identifier.
        batch_id: String,
        /// Document identifier.
        document_id: String,
        /// Error classification.
        kind: ErrorKind,
        /// Error message.
        reason: String,
        /// Attempts made.
        attempts: u32,
    },
    /// A document was never dispatched because the batch was cancelled.
    DocumentCancelled {
        /// Batch identifier.
        batch_id: String,
        /// Document identifier.
        document_id: String,
    },
    /// Every document of the batch has an outcome.
    BatchCompleted {
        /// Batch identifier.
        batch_id: String,
        /// Documents that succeeded.
        succeeded: usize,
        /// Documents that failed or were cancelled.
        failed: usize,
        /// Whether the batch was cancelled.
        cancelled: bool,
    },
}

impl PipelineEvent {
    /// Batch this event belongs to.
    #[must_use]
    pub fn batch_id(&self) -> &str {
        match self {
            Self::DocumentStarted { batch_id, .. }
            | Self::DocumentSucceeded { batch_id, .. }
            | Self::DocumentFailed { batch_id, .. }
            | Self::DocumentCancelled { batch_id, .. }
            | Self::BatchCompleted { batch_id, .. } => batch_id,
        }
    }

    /// Document this event refers to, if any.
    #[must_use]
    pub fn document_id(&self) -> Option<&str> {
        match self {
            Self::DocumentStarted { document_id, .. }
            | Self::DocumentSucceeded { document_id, .. }
            | Self::DocumentFailed { document_id, .. }
            | Self::DocumentCancelled { document_id, .. } => Some(document_id),
            Self::BatchCompleted { .. } => None,
        }
    }
}

/// Receives pipeline events.
///
/// Hooks are called from worker threads and must not block for long.
///
/// # Examples
///
/// ```
/// use chunkbench::pipeline::{MonitoringHook, PipelineEvent};
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// let seen = AtomicUsize::new(0);
/// let hook = |_: &PipelineEvent| {
///     seen.fetch_add(1, Ordering::Relaxed);
/// };
/// hook.on_event(&PipelineEvent::BatchCompleted {
///     batch_id: "b".into(),
///     succeeded: 1,
///     failed: 0,
///     cancelled: false,
/// });
/// assert_eq!(seen.load(Ordering::Relaxed), 1);
/// ```
pub trait MonitoringHook: Send + Sync {
    /// Handles one event.
    fn on_event(&self, event: &PipelineEvent);
}

impl<F> MonitoringHook for F
where
    F: Fn(&PipelineEvent) + Send + Sync,
{
    fn on_event(&self, event: &PipelineEvent) {
        self(event);
    }
}

/// Hook that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHook;

impl MonitoringHook for NoopHook {
    fn on_event(&self, _event: &PipelineEvent) {}
}

/// Hook that logs events with `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingHook;

impl MonitoringHook for TracingHook {
    fn on_event(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::DocumentStarted {
                batch_id,
                document_id,
                attempt,
            } => info!(batch = %batch_id, document = %document_id, attempt, "document started"),
            PipelineEvent::DocumentSucceeded {
                batch_id,
                document_id,
                chunk_count,
                attempts,
            } => info!(
                batch = %batch_id,
                document = %document_id,
                chunks = chunk_count,
                attempts,
                "document succeeded"
            ),
            PipelineEvent::DocumentFailed {
                batch_id,
                document_id,
                kind,
                reason,
                attempts,
            } => warn!(
                batch = %batch_id,
                document = %document_id,
                kind = %kind,
                attempts,
                reason = %reason,
                "document failed"
            ),
            PipelineEvent::DocumentCancelled { batch_id, document_id } => {
                info!(batch = %batch_id, document = %document_id, "document cancelled");
            }
            PipelineEvent::BatchCompleted {
                batch_id,
                succeeded,
                failed,
                cancelled,
            } => info!(batch = %batch_id, succeeded, failed, cancelled, "batch completed"),
        }
    }
}
