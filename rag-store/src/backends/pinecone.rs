//! Pinecone data-plane REST API (`/vectors/upsert`, `/vectors/delete`, `/query`).

use std::ops::Range;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{BatchSink, status_message, write_all_or_nothing};
use crate::config::PineconeConfig;
use crate::embed::{EmbeddingsProvider, check_vectors};
use crate::errors::RagError;
use crate::record::{KnowledgeChunk, RetrievalResult, RetrievedChunk};
use crate::store::{VectorStore, check_k, rank};

const API_VERSION: &str = "2024-07";

pub struct PineconeStore {
    http: reqwest::Client,
    upsert_url: String,
    delete_url: String,
    query_url: String,
    namespace: Option<String>,
    batch: usize,
    embedder: Arc<dyn EmbeddingsProvider>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VectorMetadata<'a> {
    text: &'a str,
    source: &'a str,
    chunk: usize,
    total_chunks: usize,
}

#[derive(Serialize)]
struct UpsertVector<'a> {
    id: String,
    values: &'a [f32],
    metadata: VectorMetadata<'a>,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<UpsertVector<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Serialize)]
struct DeleteRequest<'a> {
    ids: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<Match>,
}

#[derive(Deserialize)]
struct Match {
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<serde_json::Value>,
}

impl PineconeStore {
    pub fn new(
        cfg: &PineconeConfig,
        batch: usize,
        embedder: Arc<dyn EmbeddingsProvider>,
    ) -> Result<Self, RagError> {
        let host = cfg.index_host.trim_end_matches('/');
        let base = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{host}")
        };

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("X-Pinecone-API-Version", HeaderValue::from_static(API_VERSION));
        headers.insert(
            "Api-Key",
            HeaderValue::from_str(&cfg.api_key)
                .map_err(|_| RagError::Config("PINECONE_API_KEY is not a valid header value".into()))?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| RagError::Config(format!("pinecone client: {e}")))?;

        Ok(Self {
            http,
            upsert_url: format!("{base}/vectors/upsert"),
            delete_url: format!("{base}/vectors/delete"),
            query_url: format!("{base}/query"),
            namespace: cfg.namespace.clone(),
            batch: batch.max(1),
            embedder,
        })
    }
}

/// Pinecone keeps the chunk text in metadata under `text`.
fn chunk_from_metadata(metadata: Option<serde_json::Value>) -> KnowledgeChunk {
    let content = metadata
        .as_ref()
        .and_then(|m| m.get("text"))
        .and_then(|t| t.as_str())
        .unwrap_or_default()
        .to_string();
    KnowledgeChunk::from_row(content, metadata)
}

#[async_trait]
impl VectorStore for PineconeStore {
    fn backend(&self) -> &'static str {
        "pinecone"
    }

    async fn embed_and_store(&self, chunks: &[KnowledgeChunk]) -> Result<usize, RagError> {
        if chunks.is_empty() {
            return Ok(0);
        }
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        check_vectors(chunks.len(), &vectors, None)?;

        let ids: Vec<String> = chunks.iter().map(KnowledgeChunk::point_id).collect();
        let started = Instant::now();
        let sink = PineconeWrite {
            store: self,
            chunks,
            vectors: &vectors,
            ids: &ids,
        };
        let written = write_all_or_nothing(&sink, &ids, self.batch).await?;

        info!(
            vectors = written,
            latency_ms = started.elapsed().as_millis(),
            "pinecone: upserted"
        );
        Ok(written)
    }

    async fn retrieve(&self, query: &str, k: usize) -> Result<RetrievalResult, RagError> {
        check_k(k)?;
        let qv = self.embedder.embed_query(query).await?;

        let started = Instant::now();
        let resp = self
            .http
            .post(&self.query_url)
            .json(&QueryRequest {
                vector: &qv,
                top_k: k,
                include_metadata: true,
                include_values: false,
                namespace: self.namespace.as_deref(),
            })
            .send()
            .await
            .map_err(|e| RagError::Retrieval(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(RagError::Retrieval(status_message(resp).await));
        }
        let body: QueryResponse = resp
            .json()
            .await
            .map_err(|e| RagError::Retrieval(format!("decode query response: {e}")))?;

        debug!(
            hits = body.matches.len(),
            latency_ms = started.elapsed().as_millis(),
            "pinecone: queried"
        );
        let hits = body
            .matches
            .into_iter()
            .map(|m| RetrievedChunk {
                chunk: chunk_from_metadata(m.metadata),
                score: m.score,
            })
            .collect();
        Ok(rank(hits, k))
    }
}

/// One `embed_and_store` call, written in upsert-sized slices.
struct PineconeWrite<'a> {
    store: &'a PineconeStore,
    chunks: &'a [KnowledgeChunk],
    vectors: &'a [Vec<f32>],
    ids: &'a [String],
}

#[async_trait]
impl BatchSink for PineconeWrite<'_> {
    async fn write(&self, range: Range<usize>) -> Result<(), RagError> {
        let body = UpsertRequest {
            vectors: range
                .map(|i| {
                    let c = &self.chunks[i];
                    UpsertVector {
                        id: self.ids[i].clone(),
                        values: &self.vectors[i],
                        metadata: VectorMetadata {
                            text: &c.content,
                            source: &c.source_path,
                            chunk: c.chunk_index,
                            total_chunks: c.total_chunks,
                        },
                    }
                })
                .collect(),
            namespace: self.store.namespace.as_deref(),
        };
        self.store.post(&self.store.upsert_url, &body).await
    }

    async fn remove(&self, ids: &[String]) -> Result<(), RagError> {
        let body = DeleteRequest {
            ids,
            namespace: self.store.namespace.as_deref(),
        };
        self.store.post(&self.store.delete_url, &body).await
    }
}

impl PineconeStore {
    async fn post<B: Serialize + Sync>(&self, url: &str, body: &B) -> Result<(), RagError> {
        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| RagError::StoreWrite(e.to_string()))?;
        if !resp.status().is_success() {
            let msg = status_message(resp).await;
            warn!(url, "pinecone write failed: {msg}");
            return Err(RagError::StoreWrite(msg));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use axum::{Json, Router, extract::State, http::StatusCode, routing::post};

    use super::*;
    use crate::test_support::{HashEmbedder, serve};

    #[derive(Default)]
    struct Recorded {
        upserts: usize,
        upserted: Vec<String>,
        deleted: Vec<String>,
    }

    #[derive(Clone)]
    struct Index {
        /// 1-based upsert call that answers 500; 0 never fails.
        fail_on: usize,
        rec: Arc<Mutex<Recorded>>,
    }

    fn ids_of(body: &serde_json::Value, list: &str, key: Option<&str>) -> Vec<String> {
        body[list]
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|v| key.map_or(v, |k| &v[k]).as_str().map(str::to_string))
            .collect()
    }

    async fn upsert(State(ix): State<Index>, Json(body): Json<serde_json::Value>) -> (StatusCode, &'static str) {
        let mut rec = ix.rec.lock().unwrap();
        rec.upserts += 1;
        if rec.upserts == ix.fail_on {
            return (StatusCode::INTERNAL_SERVER_ERROR, "boom");
        }
        rec.upserted.extend(ids_of(&body, "vectors", Some("id")));
        (StatusCode::OK, "{}")
    }

    async fn delete(State(ix): State<Index>, Json(body): Json<serde_json::Value>) -> (StatusCode, &'static str) {
        ix.rec.lock().unwrap().deleted.extend(ids_of(&body, "ids", None));
        (StatusCode::OK, "{}")
    }

    async fn local_index(fail_on: usize, batch: usize) -> (PineconeStore, Arc<Mutex<Recorded>>) {
        let rec = Arc::new(Mutex::new(Recorded::default()));
        let router = Router::new()
            .route("/vectors/upsert", post(upsert))
            .route("/vectors/delete", post(delete))
            .with_state(Index { fail_on, rec: rec.clone() });
        let cfg = PineconeConfig {
            index_host: serve(router).await,
            api_key: "pc-key".into(),
            namespace: None,
        };
        let store = PineconeStore::new(&cfg, batch, Arc::new(HashEmbedder::default())).unwrap();
        (store, rec)
    }

    fn chunks(n: usize) -> Vec<KnowledgeChunk> {
        (1..=n)
            .map(|i| KnowledgeChunk {
                content: format!("paragraph {i}"),
                source_path: "faq.txt".into(),
                chunk_index: i,
                total_chunks: n,
            })
            .collect()
    }

    #[tokio::test]
    async fn upserts_in_batches() {
        let (store, rec) = local_index(0, 2).await;
        let chunks = chunks(3);
        assert_eq!(store.embed_and_store(&chunks).await.unwrap(), 3);

        let rec = rec.lock().unwrap();
        assert_eq!(rec.upserts, 2);
        assert_eq!(rec.upserted, chunks.iter().map(KnowledgeChunk::point_id).collect::<Vec<_>>());
        assert!(rec.deleted.is_empty());
    }

    #[tokio::test]
    async fn failed_batch_deletes_earlier_batches() {
        let (store, rec) = local_index(3, 1).await;
        let chunks = chunks(3);
        let err = store.embed_and_store(&chunks).await.unwrap_err();
        assert!(matches!(err, RagError::StoreWrite(ref m) if m.contains("boom")));

        let rec = rec.lock().unwrap();
        assert_eq!(rec.upserts, 3);
        assert_eq!(rec.upserted, vec![chunks[0].point_id(), chunks[1].point_id()]);
        assert_eq!(rec.deleted, rec.upserted);
    }

    #[test]
    fn bare_host_gets_https_scheme() {
        let cfg = PineconeConfig {
            index_host: "docs-abc123.svc.pinecone.io".into(),
            api_key: "pc-key".into(),
            namespace: None,
        };
        let s = PineconeStore::new(&cfg, 100, Arc::new(HashEmbedder::default())).unwrap();
        assert_eq!(s.upsert_url, "https://docs-abc123.svc.pinecone.io/vectors/upsert");
        assert_eq!(s.query_url, "https://docs-abc123.svc.pinecone.io/query");
    }

    #[test]
    fn query_request_uses_camel_case_and_skips_empty_namespace() {
        let req = QueryRequest {
            vector: &[1.0],
            top_k: 3,
            include_metadata: true,
            include_values: false,
            namespace: None,
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(
            v,
            serde_json::json!({"vector": [1.0], "topK": 3, "includeMetadata": true, "includeValues": false})
        );
    }

    #[test]
    fn match_metadata_becomes_chunk() {
        let body: QueryResponse = serde_json::from_str(
            r#"{"matches": [{"id": "x", "score": 0.9,
                "metadata": {"text": "hello", "source": "k.txt", "chunk": 2, "totalChunks": 5}}]}"#,
        )
        .unwrap();
        let m = body.matches.into_iter().next().unwrap();
        let chunk = chunk_from_metadata(m.metadata);
        assert_eq!(chunk.content, "hello");
        assert_eq!(chunk.source_path, "k.txt");
        assert_eq!((chunk.chunk_index, chunk.total_chunks), (2, 5));
    }
}
