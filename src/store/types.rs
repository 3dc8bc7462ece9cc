//! Core data types and error definitions for the document store.

use crate::qdrant::QdrantError;
use thiserror::Error;

/// Errors emitted by the document store during ingestion or search.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Embedding provider failed to produce vectors for the input text.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] crate::embedding::EmbeddingClientError),
    /// Qdrant interaction failed during ingestion or search.
    #[error("Qdrant request failed: {0}")]
    Qdrant(#[from] QdrantError),
}

/// Summary of a completed ingestion.
#[derive(Debug, Clone, Copy)]
pub struct IngestOutcome {
    /// Number of new chunks stored by this call; zero when the document was already indexed.
    pub chunk_count: usize,
    /// Whether the source document had chunks stored before this call.
    pub already_indexed: bool,
}

/// A retrieved passage with provenance and similarity score.
#[derive(Debug, Clone)]
pub struct Passage {
    /// Identity of the source document.
    pub source: String,
    /// Position of the chunk within its document.
    pub chunk_id: usize,
    /// Stored chunk text.
    pub text: String,
    /// Similarity score reported by the index.
    pub score: f32,
}

/// Result of a similarity search.
///
/// `NoMatch` is an explicit sentinel: the index was empty, or nothing cleared the score
/// floor. It is deliberately distinct from an error so callers can render "no relevant
/// sections" instead of a failure.
#[derive(Debug, Clone)]
pub enum SearchOutcome {
    /// Ordered passages, best match first.
    Passages(Vec<Passage>),
    /// Nothing relevant was found.
    NoMatch,
}

impl SearchOutcome {
    /// Join the retrieved passages into a single context block, or the sentinel text.
    pub fn as_context(&self) -> String {
        match self {
            Self::Passages(passages) => passages
                .iter()
                .map(|passage| passage.text.as_str())
                .collect::<Vec<_>>()
                .join("\n\n---\n\n"),
            Self::NoMatch => NO_RELEVANT_SECTIONS.to_string(),
        }
    }
}

/// Sentinel text surfaced when search finds nothing relevant.
pub const NO_RELEVANT_SECTIONS: &str = "No relevant sections found.";
