//! Process-local vector store with brute-force cosine similarity.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::embed::{EmbeddingsProvider, check_vectors};
use crate::errors::RagError;
use crate::record::{KnowledgeChunk, RetrievalResult, RetrievedChunk};
use crate::store::{VectorStore, check_k, rank};

struct Row {
    chunk: KnowledgeChunk,
    embedding: Vec<f32>,
}

pub struct MemoryStore {
    embedder: Arc<dyn EmbeddingsProvider>,
    rows: RwLock<HashMap<String, Row>>,
}

impl MemoryStore {
    pub fn new(embedder: Arc<dyn EmbeddingsProvider>) -> Self {
        Self {
            embedder,
            rows: RwLock::new(HashMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn embed_and_store(&self, chunks: &[KnowledgeChunk]) -> Result<usize, RagError> {
        if chunks.is_empty() {
            return Ok(0);
        }
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        check_vectors(chunks.len(), &vectors, None)?;

        let mut rows = self.rows.write().await;
        if let (Some(existing), Some(first)) = (rows.values().next(), vectors.first()) {
            if existing.embedding.len() != first.len() {
                return Err(RagError::VectorSizeMismatch {
                    got: first.len(),
                    want: existing.embedding.len(),
                });
            }
        }
        for (chunk, embedding) in chunks.iter().zip(vectors) {
            rows.insert(
                chunk.point_id(),
                Row {
                    chunk: chunk.clone(),
                    embedding,
                },
            );
        }
        debug!(written = chunks.len(), total = rows.len(), "memory store: upserted");
        Ok(chunks.len())
    }

    async fn retrieve(&self, query: &str, k: usize) -> Result<RetrievalResult, RagError> {
        check_k(k)?;
        if self.rows.read().await.is_empty() {
            return Ok(Vec::new());
        }
        let qv = self.embedder.embed_query(query).await?;

        let rows = self.rows.read().await;
        if let Some(row) = rows.values().next() {
            if row.embedding.len() != qv.len() {
                return Err(RagError::VectorSizeMismatch {
                    got: qv.len(),
                    want: row.embedding.len(),
                });
            }
        }
        let hits = rows
            .values()
            .map(|row| RetrievedChunk {
                chunk: row.chunk.clone(),
                score: cosine(&qv, &row.embedding),
            })
            .collect();
        Ok(rank(hits, k))
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let (mut dot, mut na, mut nb) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na.sqrt() * nb.sqrt())
}
