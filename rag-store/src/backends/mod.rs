//! Concrete [`VectorStore`](crate::store::VectorStore) implementations.

mod memory;
mod pinecone;
mod qdrant;
mod supabase;

pub use memory::MemoryStore;
pub use pinecone::PineconeStore;
pub use qdrant::QdrantStore;
pub use supabase::SupabaseStore;

use std::ops::Range;

use async_trait::async_trait;
use reqwest::Response;
use tracing::{error, warn};

use crate::errors::RagError;
use llm_service::error_handler::make_snippet;

/// Reads a non-2xx response into a short `HTTP <status>: <body>` message.
pub(crate) async fn status_message(resp: Response) -> String {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    format!("HTTP {status}: {}", make_snippet(&body))
}

/// A prepared write that a backend can only commit in slices.
///
/// `write` commits the items in `range`; `remove` deletes records by the
/// ids they were written under.
#[async_trait]
pub(crate) trait BatchSink: Send + Sync {
    async fn write(&self, range: Range<usize>) -> Result<(), RagError>;
    async fn remove(&self, ids: &[String]) -> Result<(), RagError>;
}

/// Commits `ids.len()` items in `batch`-sized slices. If a slice fails, the
/// slices already committed are removed before the error is returned, so
/// the call either stores everything or nothing.
pub(crate) async fn write_all_or_nothing<S>(
    sink: &S,
    ids: &[String],
    batch: usize,
) -> Result<usize, RagError>
where
    S: BatchSink + ?Sized,
{
    let batch = batch.max(1);
    let mut start = 0;
    while start < ids.len() {
        let end = (start + batch).min(ids.len());
        if let Err(err) = sink.write(start..end).await {
            return Err(roll_back(sink, &ids[..start], err).await);
        }
        start = end;
    }
    Ok(ids.len())
}

async fn roll_back<S>(sink: &S, committed: &[String], cause: RagError) -> RagError
where
    S: BatchSink + ?Sized,
{
    if committed.is_empty() {
        return cause;
    }
    match sink.remove(committed).await {
        Ok(()) => {
            warn!(removed = committed.len(), "partial write rolled back: {cause}");
            cause
        }
        Err(undo) => {
            error!(left_behind = committed.len(), "rollback failed: {undo}");
            match cause {
                RagError::StoreWrite(msg) => RagError::StoreWrite(format!(
                    "{msg}; rollback failed, {} records left behind: {undo}",
                    committed.len()
                )),
                other => other,
            }
        }
    }
}
