//! Document store service coordinating chunking, embedding, and Qdrant operations.

use crate::{
    config::{DEFAULT_SEARCH_LIMIT, get_config},
    embedding::{EmbeddingClient, get_embedding_client},
    qdrant::{ChunkInsert, QdrantService},
    store::{
        chunking::chunk_text,
        types::{IngestOutcome, Passage, SearchOutcome, StoreError},
    },
};
use async_trait::async_trait;

/// Abstraction over the retrieval index consumed by the pipeline and Q&A responder.
#[async_trait]
pub trait DocumentIndex: Send + Sync {
    /// Chunk, embed, and store a document's text; idempotent per source identity.
    async fn ingest(&self, source: &str, text: &str) -> Result<IngestOutcome, StoreError>;

    /// Find the passages most similar to `query`, optionally scoped to one document.
    async fn search(&self, query: &str, source: Option<&str>)
    -> Result<SearchOutcome, StoreError>;
}

/// Retrieval index backed by an embedding client and a Qdrant collection.
///
/// The store owns long-lived handles to both; construct it once near process start and
/// share it through an `Arc`.
pub struct DocumentStore {
    embedding_client: Box<dyn EmbeddingClient + Send + Sync>,
    qdrant: QdrantService,
    collection: String,
    chunk_size: usize,
    chunk_overlap: usize,
    search_limit: usize,
    score_threshold: Option<f32>,
}

impl DocumentStore {
    /// Build a store from explicit parts. Used directly by tests; production code goes
    /// through [`DocumentStore::from_config`].
    pub fn new(
        embedding_client: Box<dyn EmbeddingClient + Send + Sync>,
        qdrant: QdrantService,
        collection: String,
        chunk_size: usize,
        chunk_overlap: usize,
        search_limit: usize,
        score_threshold: Option<f32>,
    ) -> Self {
        Self {
            embedding_client,
            qdrant,
            collection,
            chunk_size,
            chunk_overlap,
            search_limit,
            score_threshold,
        }
    }

    /// Build the store from global configuration, ensuring the collection exists.
    pub async fn from_config() -> Result<Self, StoreError> {
        let config = get_config();
        let qdrant = QdrantService::new(&config.qdrant_url, config.qdrant_api_key.clone())?;
        qdrant
            .create_collection_if_not_exists(
                &config.qdrant_collection_name,
                config.embedding_dimension as u64,
            )
            .await?;
        qdrant
            .ensure_payload_indexes(&config.qdrant_collection_name)
            .await?;
        tracing::debug!(collection = %config.qdrant_collection_name, "Document collection ready");

        Ok(Self::new(
            get_embedding_client(),
            qdrant,
            config.qdrant_collection_name.clone(),
            config.effective_chunk_size(),
            config.effective_chunk_overlap(),
            config.search_limit.unwrap_or(DEFAULT_SEARCH_LIMIT),
            config.search_score_threshold,
        ))
    }
}

#[async_trait]
impl DocumentIndex for DocumentStore {
    /// Idempotent ingestion: a document whose identity already has chunks stored is
    /// skipped and reported with a zero chunk count.
    ///
    /// Two simultaneous first ingests of the same new source can both pass the
    /// count check and store duplicate chunks. Retrieval tolerates the duplicates,
    /// so the race is accepted rather than locked against.
    async fn ingest(&self, source: &str, text: &str) -> Result<IngestOutcome, StoreError> {
        let existing = self.qdrant.count_by_source(&self.collection, source).await?;
        if existing > 0 {
            tracing::info!(source, existing, "Document already indexed; skipping");
            return Ok(IngestOutcome {
                chunk_count: 0,
                already_indexed: true,
            });
        }

        let chunks = chunk_text(text, self.chunk_size, self.chunk_overlap);
        if chunks.is_empty() {
            tracing::warn!(source, "Document produced no chunks");
            return Ok(IngestOutcome {
                chunk_count: 0,
                already_indexed: false,
            });
        }

        let embeddings = self.embedding_client.generate_embeddings(chunks.clone()).await?;
        debug_assert_eq!(chunks.len(), embeddings.len());

        let inserts: Vec<ChunkInsert> = chunks
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(chunk_id, (text, vector))| ChunkInsert {
                source: source.to_string(),
                chunk_id,
                text,
                vector,
            })
            .collect();

        let stored = self.qdrant.index_chunks(&self.collection, inserts).await?;
        tracing::info!(source, chunks = stored, "Document ingested");

        Ok(IngestOutcome {
            chunk_count: stored,
            already_indexed: false,
        })
    }

    async fn search(
        &self,
        query: &str,
        source: Option<&str>,
    ) -> Result<SearchOutcome, StoreError> {
        let mut vectors = self
            .embedding_client
            .generate_embeddings(vec![query.to_string()])
            .await?;
        let vector = vectors.pop().ok_or_else(|| {
            crate::embedding::EmbeddingClientError::GenerationFailed(
                "provider returned no vectors for the query".to_string(),
            )
        })?;

        let hits = self
            .qdrant
            .search_points(
                &self.collection,
                vector,
                source,
                self.search_limit,
                self.score_threshold,
            )
            .await?;

        let passages: Vec<Passage> = hits
            .into_iter()
            .filter_map(|hit| {
                let payload = hit.payload?;
                let text = payload.get("text")?.as_str()?.to_string();
                let source = payload
                    .get("source")
                    .and_then(|value| value.as_str())
                    .unwrap_or_default()
                    .to_string();
                let chunk_id = payload
                    .get("chunk_id")
                    .and_then(serde_json::Value::as_u64)
                    .unwrap_or_default() as usize;
                Some(Passage {
                    source,
                    chunk_id,
                    text,
                    score: hit.score,
                })
            })
            .collect();

        if passages.is_empty() {
            tracing::debug!(query, "Search found no relevant sections");
            return Ok(SearchOutcome::NoMatch);
        }

        tracing::debug!(query, passages = passages.len(), "Search completed");
        Ok(SearchOutcome::Passages(passages))
    }
}
