//! Document store: fixed-window chunking, embedding, and similarity search.

mod chunking;
mod service;
pub mod types;

pub use service::{DocumentIndex, DocumentStore};
pub use types::{IngestOutcome, NO_RELEVANT_SECTIONS, Passage, SearchOutcome, StoreError};
