//! Core domain models.
//!
//! Documents, their structural tree, and the chunks strategies produce.
//! These are pure data types with no I/O dependencies.

pub mod chunk;
pub mod document;

pub use chunk::{Chunk, ChunkFlag, ChunkMetadata, ChunkSet, DegradationEvent};
pub use document::{Document, DocumentFormat, NodeId, NodeKind, StructuralNode};
