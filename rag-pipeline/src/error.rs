//! Typed error for the answer pipeline.

use std::path::PathBuf;

use rag_store::RagError;
use session_store::SessionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Caller input rejected before any collaborator is called.
    #[error("[Answer Pipeline] invalid request: {0}")]
    Validation(String),

    /// Condense or answer model call failed or timed out.
    #[error("[Answer Pipeline] language model failed: {0}")]
    Llm(String),

    /// Errors from the underlying rag-store crate (embedding, retrieval, writes).
    #[error("[Answer Pipeline] {0}")]
    Rag(#[from] RagError),

    #[error("[Answer Pipeline] {0}")]
    Session(#[from] SessionError),

    #[error("[Answer Pipeline] invalid configuration: {0}")]
    Config(String),

    /// Prompt template file could not be read.
    #[error("[Answer Pipeline] io error reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
