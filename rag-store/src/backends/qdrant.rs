//! Thin adapter around `qdrant-client`.
//!
//! Concentrates all Qdrant interactions behind the [`VectorStore`] API and
//! hides the builder-heavy client surface from the rest of the crate.

use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, DeletePointsBuilder, Distance, PointId, PointStruct, PointsIdsList,
    SearchParamsBuilder, SearchPointsBuilder, UpsertPointsBuilder, Value as QValue,
    VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use serde_json::json;
use tracing::{debug, info};

use super::{BatchSink, write_all_or_nothing};
use crate::config::{DistanceKind, QdrantConfig};
use crate::embed::{EmbeddingsProvider, check_vectors};
use crate::errors::RagError;
use crate::record::{KnowledgeChunk, RetrievalResult, RetrievedChunk};
use crate::store::{VectorStore, check_k, rank};

pub struct QdrantStore {
    client: Qdrant,
    collection: String,
    distance: DistanceKind,
    exact: bool,
    batch: usize,
    embedder: Arc<dyn EmbeddingsProvider>,
}

impl QdrantStore {
    pub fn new(
        cfg: &QdrantConfig,
        batch: usize,
        embedder: Arc<dyn EmbeddingsProvider>,
    ) -> Result<Self, RagError> {
        let mut builder = Qdrant::from_url(&cfg.url);
        if let Some(key) = &cfg.api_key {
            builder = builder.api_key(key.clone());
        }
        let client = builder
            .build()
            .map_err(|e| RagError::Config(format!("qdrant client: {e}")))?;

        Ok(Self {
            client,
            collection: cfg.collection.clone(),
            distance: cfg.distance,
            exact: cfg.exact_search,
            batch: batch.max(1),
            embedder,
        })
    }

    /// Creates the collection with `size`-dimensional vectors if it is missing.
    async fn ensure_collection(&self, size: usize) -> Result<(), RagError> {
        let exists = self
            .client
            .collection_exists(&self.collection)
            .await
            .map_err(|e| RagError::StoreWrite(e.to_string()))?;
        if exists {
            debug!(collection = %self.collection, "qdrant: collection exists");
            return Ok(());
        }

        let distance = match self.distance {
            DistanceKind::Cosine => Distance::Cosine,
            DistanceKind::Dot => Distance::Dot,
            DistanceKind::Euclid => Distance::Euclid,
        };
        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection)
                    .vectors_config(VectorParamsBuilder::new(size as u64, distance)),
            )
            .await
            .map_err(|e| RagError::StoreWrite(e.to_string()))?;

        info!(collection = %self.collection, size, distance = ?self.distance, "qdrant: collection created");
        Ok(())
    }
}

fn point_for(chunk: &KnowledgeChunk, vector: Vec<f32>) -> Result<PointStruct, RagError> {
    let payload = Payload::try_from(json!({
        "text": chunk.content,
        "source": chunk.source_path,
        "chunk": chunk.chunk_index,
        "totalChunks": chunk.total_chunks,
    }))
    .map_err(|e| RagError::StoreWrite(format!("payload: {e}")))?;
    Ok(PointStruct::new(chunk.point_id(), vector, payload))
}

#[async_trait]
impl VectorStore for QdrantStore {
    fn backend(&self) -> &'static str {
        "qdrant"
    }

    async fn embed_and_store(&self, chunks: &[KnowledgeChunk]) -> Result<usize, RagError> {
        if chunks.is_empty() {
            return Ok(0);
        }
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        check_vectors(chunks.len(), &vectors, None)?;
        let size = vectors.first().map(Vec::len).unwrap_or_default();

        self.ensure_collection(size).await?;

        let started = Instant::now();
        let points = chunks
            .iter()
            .zip(vectors)
            .map(|(c, v)| point_for(c, v))
            .collect::<Result<Vec<_>, _>>()?;

        let ids: Vec<String> = chunks.iter().map(KnowledgeChunk::point_id).collect();
        let sink = QdrantWrite {
            store: self,
            points: &points,
        };
        let written = write_all_or_nothing(&sink, &ids, self.batch).await?;

        info!(
            collection = %self.collection,
            points = written,
            latency_ms = started.elapsed().as_millis(),
            "qdrant: upserted"
        );
        Ok(written)
    }

    async fn retrieve(&self, query: &str, k: usize) -> Result<RetrievalResult, RagError> {
        check_k(k)?;
        let exists = self
            .client
            .collection_exists(&self.collection)
            .await
            .map_err(|e| RagError::Retrieval(e.to_string()))?;
        if !exists {
            debug!(collection = %self.collection, "qdrant: no collection yet, empty result");
            return Ok(Vec::new());
        }

        let qv = self.embedder.embed_query(query).await?;
        let mut builder =
            SearchPointsBuilder::new(&self.collection, qv, k as u64).with_payload(true);
        if self.exact {
            builder = builder.params(SearchParamsBuilder::default().exact(true));
        }

        let started = Instant::now();
        let res = self
            .client
            .search_points(builder)
            .await
            .map_err(|e| RagError::Retrieval(e.to_string()))?;
        debug!(
            hits = res.result.len(),
            latency_ms = started.elapsed().as_millis(),
            "qdrant: searched"
        );

        let hits = res
            .result
            .into_iter()
            .map(|p| {
                let payload = qpayload_to_json(p.payload);
                let content = payload
                    .get("text")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                RetrievedChunk {
                    chunk: KnowledgeChunk::from_row(content, Some(payload)),
                    score: p.score,
                }
            })
            .collect();
        Ok(rank(hits, k))
    }
}

/// One `embed_and_store` call, upserted in `batch`-sized slices.
struct QdrantWrite<'a> {
    store: &'a QdrantStore,
    points: &'a [PointStruct],
}

#[async_trait]
impl BatchSink for QdrantWrite<'_> {
    async fn write(&self, range: Range<usize>) -> Result<(), RagError> {
        self.store
            .client
            .upsert_points(
                UpsertPointsBuilder::new(&self.store.collection, self.points[range].to_vec()).wait(true),
            )
            .await
            .map_err(|e| RagError::StoreWrite(e.to_string()))?;
        Ok(())
    }

    async fn remove(&self, ids: &[String]) -> Result<(), RagError> {
        let ids: Vec<PointId> = ids.iter().cloned().map(PointId::from).collect();
        self.store
            .client
            .delete_points(
                DeletePointsBuilder::new(&self.store.collection)
                    .points(PointsIdsList { ids })
                    .wait(true),
            )
            .await
            .map_err(|e| RagError::StoreWrite(e.to_string()))?;
        Ok(())
    }
}

/// Converts a Qdrant payload into JSON. Nested structures map to `Null`.
fn qpayload_to_json(payload: HashMap<String, QValue>) -> serde_json::Value {
    use qdrant_client::qdrant::value::Kind as K;
    let mut m = serde_json::Map::new();
    for (k, v) in payload {
        let j = match v.kind {
            Some(K::StringValue(s)) => serde_json::Value::String(s),
            Some(K::IntegerValue(i)) => serde_json::Value::Number(i.into()),
            Some(K::DoubleValue(f)) => json!(f),
            Some(K::BoolValue(b)) => serde_json::Value::Bool(b),
            _ => serde_json::Value::Null,
        };
        m.insert(k, j);
    }
    serde_json::Value::Object(m)
}

#[cfg(test)]
mod tests {
    use super::*;
    use qdrant_client::qdrant::value::Kind;

    #[test]
    fn payload_roundtrips_chunk_fields() {
        let mut p = HashMap::new();
        p.insert("text".to_string(), QValue { kind: Some(Kind::StringValue("body".into())) });
        p.insert("source".to_string(), QValue { kind: Some(Kind::StringValue("k.txt".into())) });
        p.insert("chunk".to_string(), QValue { kind: Some(Kind::IntegerValue(2)) });
        p.insert("totalChunks".to_string(), QValue { kind: Some(Kind::IntegerValue(4)) });

        let json = qpayload_to_json(p);
        let chunk = KnowledgeChunk::from_row("body".into(), Some(json));
        assert_eq!(chunk.source_path, "k.txt");
        assert_eq!((chunk.chunk_index, chunk.total_chunks), (2, 4));
    }

    #[test]
    fn point_uses_stable_uuid_id() {
        let chunk = KnowledgeChunk {
            content: "x".into(),
            source_path: "k.txt".into(),
            chunk_index: 1,
            total_chunks: 1,
        };
        assert!(point_for(&chunk, vec![0.1, 0.2]).is_ok());
    }
}
