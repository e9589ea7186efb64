//! Vector store abstraction and backend construction.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::backends::{MemoryStore, PineconeStore, QdrantStore, SupabaseStore};
use crate::config::{RagConfig, VectorBackend};
use crate::embed::EmbeddingsProvider;
use crate::errors::RagError;
use crate::record::{KnowledgeChunk, RetrievalResult, RetrievedChunk};

/// A pluggable vector database.
///
/// Implementations embed through an [`EmbeddingsProvider`] and must compute
/// every embedding of a batch before issuing any write, so an embedding
/// failure never leaves a half-written batch behind.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    /// Embeds and persists `chunks`. Returns the number of rows written.
    async fn embed_and_store(&self, chunks: &[KnowledgeChunk]) -> Result<usize, RagError>;

    /// Top-`k` chunks most similar to `query`, most similar first.
    /// An empty store yields an empty result.
    async fn retrieve(&self, query: &str, k: usize) -> Result<RetrievalResult, RagError>;
}

/// Builds the backend selected by `cfg`.
pub async fn connect(
    cfg: &RagConfig,
    embedder: Arc<dyn EmbeddingsProvider>,
) -> Result<Arc<dyn VectorStore>, RagError> {
    cfg.validate()?;
    info!(backend = cfg.backend.name(), "connecting vector store");

    let store: Arc<dyn VectorStore> = match &cfg.backend {
        VectorBackend::Supabase(c) => Arc::new(SupabaseStore::new(c, embedder)?),
        VectorBackend::Pinecone(c) => Arc::new(PineconeStore::new(c, cfg.upsert_batch, embedder)?),
        VectorBackend::Qdrant(c) => Arc::new(QdrantStore::new(c, cfg.upsert_batch, embedder)?),
        VectorBackend::Memory => Arc::new(MemoryStore::new(embedder)),
    };
    Ok(store)
}

pub(crate) fn check_k(k: usize) -> Result<(), RagError> {
    if k == 0 {
        return Err(RagError::Retrieval("k must be >= 1".into()));
    }
    Ok(())
}

/// Sorts hits by descending score and keeps the best `k`.
pub(crate) fn rank(mut hits: Vec<RetrievedChunk>, k: usize) -> RetrievalResult {
    hits.sort_by(|a, b| b.score.total_cmp(&a.score));
    hits.truncate(k);
    hits
}
