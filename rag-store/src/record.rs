//! Core data models used by the library.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A bounded, overlapping substring of a knowledge source.
///
/// Immutable once produced by ingestion. `chunk_index` is 1-based and never
/// exceeds `total_chunks`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeChunk {
    pub content: String,
    pub source_path: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
}

/// Provenance stored next to each row, in the shape the original tables use:
/// `{ "source": ..., "chunk": ..., "totalChunks": ... }`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    #[serde(default)]
    pub source: String,
    #[serde(default = "one")]
    pub chunk: usize,
    #[serde(default = "one")]
    pub total_chunks: usize,
}

fn one() -> usize {
    1
}

impl KnowledgeChunk {
    pub fn metadata(&self) -> ChunkMetadata {
        ChunkMetadata {
            source: self.source_path.clone(),
            chunk: self.chunk_index,
            total_chunks: self.total_chunks,
        }
    }

    /// Rebuilds a chunk from a stored `(content, metadata)` row.
    ///
    /// Rows written by other tools may lack metadata; defaults keep the
    /// `1 <= chunk <= totalChunks` invariant.
    pub fn from_row(content: String, metadata: Option<serde_json::Value>) -> Self {
        let meta = metadata
            .and_then(|m| serde_json::from_value::<ChunkMetadata>(m).ok())
            .unwrap_or(ChunkMetadata {
                source: String::new(),
                chunk: 1,
                total_chunks: 1,
            });
        let chunk_index = meta.chunk.max(1);
        Self {
            content,
            source_path: meta.source,
            chunk_index,
            total_chunks: meta.total_chunks.max(chunk_index),
        }
    }

    /// Deterministic id: UUIDv5 of `source#index`, so re-ingesting a file
    /// overwrites its rows instead of duplicating them.
    pub fn point_id(&self) -> String {
        let name = format!("{}#{}", self.source_path, self.chunk_index);
        Uuid::new_v5(&Uuid::NAMESPACE_URL, name.as_bytes()).to_string()
    }
}

/// One retrieval hit: the chunk and its backend-defined similarity.
#[derive(Clone, Debug, PartialEq)]
pub struct RetrievedChunk {
    pub chunk: KnowledgeChunk,
    pub score: f32,
}

/// Ranked hits, highest similarity first, at most K long.
pub type RetrievalResult = Vec<RetrievedChunk>;
