#![deny(missing_docs)]

//! Core library for the DocSense document analysis server.

/// Text analysis capabilities backed by the generation oracle.
pub mod analysis;
/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// PDF text extraction.
pub mod extract;
/// Generation oracle client abstraction and adapters.
pub mod generation;
/// SQLite-backed run history and aggregate statistics.
pub mod history;
/// Structured logging and tracing setup.
pub mod logging;
/// Run counters for observability.
pub mod metrics;
/// Staged analysis pipeline.
pub mod pipeline;
/// Retrieval-augmented question answering.
pub mod qa;
/// Qdrant vector store integration.
pub mod qdrant;
/// Service facade wiring the capabilities together.
pub mod service;
/// Document chunking, indexing, and similarity search.
pub mod store;
