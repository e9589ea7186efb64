//! Supabase (pgvector) over PostgREST.
//!
//! Writes go to `POST /rest/v1/<table>` as one array of
//! `{content, embedding, metadata}` rows, which PostgREST inserts in a single
//! transaction; similarity search calls the `POST /rest/v1/rpc/<query>` function,
//! which answers `[{id, content, metadata, similarity}]`.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::status_message;
use crate::config::SupabaseConfig;
use crate::embed::{EmbeddingsProvider, check_vectors};
use crate::errors::RagError;
use crate::record::{ChunkMetadata, KnowledgeChunk, RetrievalResult, RetrievedChunk};
use crate::store::{VectorStore, check_k, rank};

pub struct SupabaseStore {
    http: reqwest::Client,
    insert_url: String,
    match_url: String,
    embedder: Arc<dyn EmbeddingsProvider>,
}

#[derive(Serialize)]
struct DocumentRow<'a> {
    content: &'a str,
    embedding: &'a [f32],
    metadata: ChunkMetadata,
}

#[derive(Serialize)]
struct MatchRequest<'a> {
    query_embedding: &'a [f32],
    match_count: usize,
    filter: serde_json::Value,
}

#[derive(Deserialize)]
struct MatchRow {
    content: String,
    #[serde(default)]
    metadata: Option<serde_json::Value>,
    similarity: f32,
}

impl SupabaseStore {
    pub fn new(cfg: &SupabaseConfig, embedder: Arc<dyn EmbeddingsProvider>) -> Result<Self, RagError> {
        let base = cfg.url.trim_end_matches('/');

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("apikey", header_value(&cfg.api_key)?);
        headers.insert(AUTHORIZATION, header_value(&format!("Bearer {}", cfg.api_key))?);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| RagError::Config(format!("supabase client: {e}")))?;

        Ok(Self {
            http,
            insert_url: format!("{base}/rest/v1/{}", cfg.table),
            match_url: format!("{base}/rest/v1/rpc/{}", cfg.query_name),
            embedder,
        })
    }
}

fn header_value(v: &str) -> Result<HeaderValue, RagError> {
    HeaderValue::from_str(v).map_err(|_| RagError::Config("SUPABASE_API_KEY is not a valid header value".into()))
}

#[async_trait]
impl VectorStore for SupabaseStore {
    fn backend(&self) -> &'static str {
        "supabase"
    }

    async fn embed_and_store(&self, chunks: &[KnowledgeChunk]) -> Result<usize, RagError> {
        if chunks.is_empty() {
            return Ok(0);
        }
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        check_vectors(chunks.len(), &vectors, None)?;

        let started = Instant::now();
        let rows: Vec<DocumentRow<'_>> = chunks
            .iter()
            .zip(&vectors)
            .map(|(c, v)| DocumentRow {
                content: &c.content,
                embedding: v,
                metadata: c.metadata(),
            })
            .collect();

        let resp = self
            .http
            .post(&self.insert_url)
            .header("Prefer", "return=minimal")
            .json(&rows)
            .send()
            .await
            .map_err(|e| RagError::StoreWrite(e.to_string()))?;
        if !resp.status().is_success() {
            let msg = status_message(resp).await;
            warn!(url = %self.insert_url, rows = rows.len(), "supabase insert failed: {msg}");
            return Err(RagError::StoreWrite(msg));
        }
        let written = rows.len();

        info!(
            rows = written,
            latency_ms = started.elapsed().as_millis(),
            "supabase: inserted"
        );
        Ok(written)
    }

    async fn retrieve(&self, query: &str, k: usize) -> Result<RetrievalResult, RagError> {
        check_k(k)?;
        let qv = self.embedder.embed_query(query).await?;

        let started = Instant::now();
        let resp = self
            .http
            .post(&self.match_url)
            .json(&MatchRequest {
                query_embedding: &qv,
                match_count: k,
                filter: serde_json::json!({}),
            })
            .send()
            .await
            .map_err(|e| RagError::Retrieval(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(RagError::Retrieval(status_message(resp).await));
        }
        let rows: Vec<MatchRow> = resp
            .json()
            .await
            .map_err(|e| RagError::Retrieval(format!("decode match rows: {e}")))?;

        debug!(
            hits = rows.len(),
            latency_ms = started.elapsed().as_millis(),
            "supabase: matched"
        );
        let hits = rows
            .into_iter()
            .map(|r| RetrievedChunk {
                chunk: KnowledgeChunk::from_row(r.content, r.metadata),
                score: r.similarity,
            })
            .collect();
        Ok(rank(hits, k))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use axum::{Json, Router, extract::State, http::StatusCode, routing::post};

    use super::*;
    use crate::test_support::{HashEmbedder, serve};

    fn cfg() -> SupabaseConfig {
        cfg_at("https://abc.supabase.co/")
    }

    fn cfg_at(url: &str) -> SupabaseConfig {
        SupabaseConfig {
            url: url.into(),
            api_key: "service-key".into(),
            table: "documents".into(),
            query_name: "match_documents".into(),
        }
    }

    #[test]
    fn builds_postgrest_urls() {
        let s = SupabaseStore::new(&cfg(), Arc::new(HashEmbedder::default())).unwrap();
        assert_eq!(s.insert_url, "https://abc.supabase.co/rest/v1/documents");
        assert_eq!(s.match_url, "https://abc.supabase.co/rest/v1/rpc/match_documents");
    }

    #[test]
    fn row_serializes_with_metadata_object() {
        let chunk = KnowledgeChunk {
            content: "hello".into(),
            source_path: "k.txt".into(),
            chunk_index: 1,
            total_chunks: 2,
        };
        let row = DocumentRow {
            content: &chunk.content,
            embedding: &[0.5, 0.25],
            metadata: chunk.metadata(),
        };
        let v = serde_json::to_value(&row).unwrap();
        assert_eq!(
            v,
            serde_json::json!({
                "content": "hello",
                "embedding": [0.5, 0.25],
                "metadata": {"source": "k.txt", "chunk": 1, "totalChunks": 2}
            })
        );
    }

    #[test]
    fn match_rows_decode_without_metadata() {
        let rows: Vec<MatchRow> =
            serde_json::from_str(r#"[{"id": 7, "content": "c", "similarity": 0.8}]"#).unwrap();
        assert_eq!(rows[0].content, "c");
        assert!(rows[0].metadata.is_none());
    }

    /// Request count and row count per insert seen by the local table.
    #[derive(Clone, Default)]
    struct Table {
        fail: bool,
        inserts: Arc<Mutex<Vec<usize>>>,
    }

    async fn insert(State(t): State<Table>, Json(rows): Json<Vec<serde_json::Value>>) -> (StatusCode, &'static str) {
        t.inserts.lock().unwrap().push(rows.len());
        if t.fail {
            (StatusCode::INTERNAL_SERVER_ERROR, "boom")
        } else {
            (StatusCode::CREATED, "")
        }
    }

    async fn local_table(fail: bool) -> (SupabaseStore, Table) {
        let table = Table {
            fail,
            ..Table::default()
        };
        let router = Router::new()
            .route("/rest/v1/documents", post(insert))
            .with_state(table.clone());
        let base = serve(router).await;
        let store = SupabaseStore::new(&cfg_at(&base), Arc::new(HashEmbedder::default())).unwrap();
        (store, table)
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
    async fn all_rows_go_in_one_insert() {
        let (store, table) = local_table(false).await;
        assert_eq!(store.embed_and_store(&chunks(250)).await.unwrap(), 250);
        assert_eq!(*table.inserts.lock().unwrap(), vec![250]);
    }

    #[tokio::test]
    async fn rejected_insert_is_a_single_failed_request() {
        let (store, table) = local_table(true).await;
        let err = store.embed_and_store(&chunks(3)).await.unwrap_err();
        assert!(matches!(err, RagError::StoreWrite(ref m) if m.contains("500") && m.contains("boom")));
        assert_eq!(*table.inserts.lock().unwrap(), vec![3]);
    }
}
