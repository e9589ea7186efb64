//! Runtime configuration: vector backend selection and knowledge source.

use std::path::PathBuf;
use std::str::FromStr;

use crate::chunker::ChunkingConfig;
use crate::errors::RagError;

/// Distance function used for the Qdrant vector space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DistanceKind {
    /// Cosine distance (recommended for most embeddings).
    Cosine,
    /// Dot product (useful for normalized vectors).
    Dot,
    /// Euclidean distance (L2).
    Euclid,
}

impl FromStr for DistanceKind {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cosine" => Ok(Self::Cosine),
            "dot" => Ok(Self::Dot),
            "euclid" | "l2" => Ok(Self::Euclid),
            other => Err(RagError::Config(format!("unknown distance '{other}'"))),
        }
    }
}

/// Supabase (pgvector behind PostgREST).
#[derive(Clone, Debug)]
pub struct SupabaseConfig {
    pub url: String,
    pub api_key: String,
    /// Table rows are inserted into.
    pub table: String,
    /// SQL function used for similarity search.
    pub query_name: String,
}

/// Pinecone serverless index, addressed by its data-plane host.
#[derive(Clone, Debug)]
pub struct PineconeConfig {
    pub index_host: String,
    pub api_key: String,
    pub namespace: Option<String>,
}

#[derive(Clone, Debug)]
pub struct QdrantConfig {
    /// gRPC endpoint, e.g. `http://localhost:6334`.
    pub url: String,
    pub api_key: Option<String>,
    pub collection: String,
    pub distance: DistanceKind,
    /// Exact search flag (false = HNSW ANN).
    pub exact_search: bool,
}

/// Which vector database backs the store.
#[derive(Clone, Debug)]
pub enum VectorBackend {
    Supabase(SupabaseConfig),
    Pinecone(PineconeConfig),
    Qdrant(QdrantConfig),
    /// Process-local store; contents are lost on restart.
    Memory,
}

impl VectorBackend {
    pub fn name(&self) -> &'static str {
        match self {
            VectorBackend::Supabase(_) => "supabase",
            VectorBackend::Pinecone(_) => "pinecone",
            VectorBackend::Qdrant(_) => "qdrant",
            VectorBackend::Memory => "memory",
        }
    }
}

/// Configuration for the vector store adapter.
#[derive(Clone, Debug)]
pub struct RagConfig {
    pub backend: VectorBackend,
    /// Rows per write request.
    pub upsert_batch: usize,
    /// Expected embedding dimension; checked on every embedding when set.
    pub embedding_dim: Option<usize>,
}

impl RagConfig {
    pub fn memory() -> Self {
        Self {
            backend: VectorBackend::Memory,
            upsert_batch: 100,
            embedding_dim: None,
        }
    }

    /// Reads `VECTOR_DB` and the matching backend variables.
    pub fn from_env() -> Result<Self, RagError> {
        let backend = match env_or("VECTOR_DB", "memory").to_ascii_lowercase().as_str() {
            "supabase" => VectorBackend::Supabase(SupabaseConfig {
                url: must_env("SUPABASE_URL")?,
                api_key: must_env("SUPABASE_API_KEY")?,
                table: env_or("SUPABASE_TABLE", "documents"),
                query_name: env_or("SUPABASE_QUERY", "match_documents"),
            }),
            "pinecone" => VectorBackend::Pinecone(PineconeConfig {
                index_host: must_env("PINECONE_INDEX_HOST")?,
                api_key: must_env("PINECONE_API_KEY")?,
                namespace: env_opt("PINECONE_NAMESPACE"),
            }),
            "qdrant" => VectorBackend::Qdrant(QdrantConfig {
                url: env_or("QDRANT_URL", "http://localhost:6334"),
                api_key: env_opt("QDRANT_API_KEY"),
                collection: env_or("QDRANT_COLLECTION", "documents"),
                distance: env_or("QDRANT_DISTANCE", "cosine").parse()?,
                exact_search: env_parse::<bool>("QDRANT_EXACT")?.unwrap_or(false),
            }),
            "memory" => VectorBackend::Memory,
            other => {
                return Err(RagError::Config(format!(
                    "VECTOR_DB='{other}' is not one of supabase|pinecone|qdrant|memory"
                )));
            }
        };

        let cfg = Self {
            backend,
            upsert_batch: env_parse::<usize>("UPSERT_BATCH")?.unwrap_or(100),
            embedding_dim: env_parse::<usize>("EMBEDDING_DIM")?,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validates config values.
    pub fn validate(&self) -> Result<(), RagError> {
        if self.upsert_batch == 0 {
            return Err(RagError::Config("upsert_batch must be > 0".into()));
        }
        if self.embedding_dim == Some(0) {
            return Err(RagError::Config("embedding_dim must be > 0".into()));
        }
        match &self.backend {
            VectorBackend::Supabase(c) => {
                non_empty("SUPABASE_URL", &c.url)?;
                non_empty("SUPABASE_TABLE", &c.table)?;
                non_empty("SUPABASE_QUERY", &c.query_name)?;
            }
            VectorBackend::Pinecone(c) => non_empty("PINECONE_INDEX_HOST", &c.index_host)?,
            VectorBackend::Qdrant(c) => {
                non_empty("QDRANT_URL", &c.url)?;
                non_empty("QDRANT_COLLECTION", &c.collection)?;
            }
            VectorBackend::Memory => {}
        }
        Ok(())
    }
}

/// Kind of content being ingested; picks the chunking preset and the
/// file extensions accepted when the knowledge path is a directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KnowledgeKind {
    Text,
    Code,
}

impl KnowledgeKind {
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            KnowledgeKind::Text => &["txt", "md"],
            KnowledgeKind::Code => &["js", "html"],
        }
    }

    pub fn default_chunking(self) -> ChunkingConfig {
        match self {
            KnowledgeKind::Text => ChunkingConfig::knowledge(),
            KnowledgeKind::Code => ChunkingConfig::code(),
        }
    }
}

impl FromStr for KnowledgeKind {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "knowledge" => Ok(Self::Text),
            "code" => Ok(Self::Code),
            other => Err(RagError::Config(format!("unknown knowledge kind '{other}'"))),
        }
    }
}

/// Where `/init` loads knowledge from and how it is chunked.
#[derive(Clone, Debug)]
pub struct KnowledgeSource {
    pub path: PathBuf,
    pub kind: KnowledgeKind,
    pub chunking: ChunkingConfig,
}

impl KnowledgeSource {
    pub fn from_env() -> Result<Self, RagError> {
        let kind: KnowledgeKind = env_or("KNOWLEDGE_KIND", "text").parse()?;
        let mut chunking = kind.default_chunking();
        if let Some(size) = env_parse::<usize>("CHUNK_SIZE")? {
            chunking.chunk_size = size;
        }
        if let Some(overlap) = env_parse::<usize>("CHUNK_OVERLAP")? {
            chunking.chunk_overlap = overlap;
        }
        chunking.validate()?;

        Ok(Self {
            path: PathBuf::from(env_or("KNOWLEDGE_PATH", "knowledge.txt")),
            kind,
            chunking,
        })
    }
}

fn must_env(name: &'static str) -> Result<String, RagError> {
    env_opt(name).ok_or_else(|| RagError::Config(format!("missing env var {name}")))
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(name: &str, default: &str) -> String {
    env_opt(name).unwrap_or_else(|| default.to_string())
}

fn env_parse<T: FromStr>(name: &str) -> Result<Option<T>, RagError>
where
    T::Err: std::fmt::Display,
{
    env_opt(name)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| RagError::Config(format!("{name}='{raw}': {e}")))
        })
        .transpose()
}

fn non_empty(name: &str, value: &str) -> Result<(), RagError> {
    if value.trim().is_empty() {
        return Err(RagError::Config(format!("{name} is empty")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn knowledge_kind_picks_presets() {
        let text = KnowledgeKind::Text.default_chunking();
        assert_eq!((text.chunk_size, text.chunk_overlap), (500, 50));
        let code = KnowledgeKind::Code.default_chunking();
        assert_eq!((code.chunk_size, code.chunk_overlap), (2000, 200));
        assert!(KnowledgeKind::Code.extensions().contains(&"js"));
    }

    #[test]
    fn parses_kinds_and_distances() {
        assert_eq!("CODE".parse::<KnowledgeKind>().unwrap(), KnowledgeKind::Code);
        assert!("pdf".parse::<KnowledgeKind>().is_err());
        assert_eq!("l2".parse::<DistanceKind>().unwrap(), DistanceKind::Euclid);
    }

    #[test]
    fn validate_rejects_zero_batch_and_empty_fields() {
        let mut cfg = RagConfig::memory();
        assert!(cfg.validate().is_ok());
        cfg.upsert_batch = 0;
        assert!(matches!(cfg.validate(), Err(RagError::Config(_))));

        let cfg = RagConfig {
            backend: VectorBackend::Supabase(SupabaseConfig {
                url: "https://x.supabase.co".into(),
                api_key: "k".into(),
                table: " ".into(),
                query_name: "match_documents".into(),
            }),
            upsert_batch: 10,
            embedding_dim: None,
        };
        assert!(matches!(cfg.validate(), Err(RagError::Config(_))));
    }
}
