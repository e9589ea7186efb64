//! Knowledge ingestion and retrieval over pluggable vector stores.
//!
//! This crate provides a clean API to:
//! - Split knowledge sources into overlapping chunks ([`ingest`])
//! - Embed and persist chunks in Supabase, Pinecone, Qdrant or memory
//! - Retrieve the top-K most similar chunks for a query
//!
//! The design is flat and splits responsibilities into focused modules.

mod backends;
mod chunker;
mod config;
mod embed;
mod errors;
mod ingest;
mod record;
mod store;

pub use backends::{MemoryStore, PineconeStore, QdrantStore, SupabaseStore};
pub use chunker::ChunkingConfig;
pub use config::{
    DistanceKind, KnowledgeKind, KnowledgeSource, PineconeConfig, QdrantConfig, RagConfig,
    SupabaseConfig, VectorBackend,
};
pub use embed::{EmbeddingsProvider, ServiceEmbedder};
pub use errors::RagError;
pub use ingest::{ingest, ingest_dir, ingest_file, ingest_source};
pub use record::{ChunkMetadata, KnowledgeChunk, RetrievalResult, RetrievedChunk};
pub use store::{VectorStore, connect};

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, trace};

/// High-level facade over a connected [`VectorStore`].
///
/// This is the single entry point recommended for application code.
#[derive(Clone)]
pub struct RagStore {
    store: Arc<dyn VectorStore>,
}

impl RagStore {
    /// Connects the backend selected by `cfg`.
    pub async fn new(
        cfg: &RagConfig,
        embedder: Arc<dyn EmbeddingsProvider>,
    ) -> Result<Self, RagError> {
        Ok(Self {
            store: connect(cfg, embedder).await?,
        })
    }

    pub fn from_store(store: Arc<dyn VectorStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> Arc<dyn VectorStore> {
        Arc::clone(&self.store)
    }

    /// Ingests `source` and stores every chunk. Returns the rows written.
    ///
    /// # Errors
    /// `Io`/`Config` before anything is embedded; `Embedding` or
    /// `StoreWrite` from the backend.
    pub async fn load_knowledge(&self, source: &KnowledgeSource) -> Result<usize, RagError> {
        let started = Instant::now();
        let chunks = ingest_source(source).await?;
        trace!(chunks = chunks.len(), "RagStore::load_knowledge ingested");

        let written = self.store.embed_and_store(&chunks).await?;
        info!(
            backend = self.store.backend(),
            path = %source.path.display(),
            chunks = written,
            latency_ms = started.elapsed().as_millis(),
            "knowledge loaded"
        );
        Ok(written)
    }

    pub async fn retrieve(&self, query: &str, k: usize) -> Result<RetrievalResult, RagError> {
        trace!(k, "RagStore::retrieve");
        self.store.retrieve(query, k).await
    }
}
