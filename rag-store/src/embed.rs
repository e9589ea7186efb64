//! Embedding abstraction used by every vector backend.

use std::sync::Arc;

use async_trait::async_trait;
use llm_service::LlmServiceProfiles;
use tracing::debug;

use crate::errors::RagError;

/// Provider interface for embedding generation.
///
/// Implement this trait to plug in your own embedding backend.
#[async_trait]
pub trait EmbeddingsProvider: Send + Sync {
    /// Embeds `texts`, returning one vector per input in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError>;

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, RagError> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RagError::Embedding("provider returned no vector".into()))
    }
}

/// Embeddings backed by the shared LLM service's embedding profile.
#[derive(Clone, Debug)]
pub struct ServiceEmbedder {
    svc: Arc<LlmServiceProfiles>,
    /// Expected embedding dimension size.
    dim: Option<usize>,
}

impl ServiceEmbedder {
    pub fn new(svc: Arc<LlmServiceProfiles>, dim: Option<usize>) -> Self {
        Self { svc, dim }
    }
}

#[async_trait]
impl EmbeddingsProvider for ServiceEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        let vectors = self
            .svc
            .embed_batch(texts)
            .await
            .map_err(|e| RagError::Embedding(e.to_string()))?;
        check_vectors(texts.len(), &vectors, self.dim)?;
        Ok(vectors)
    }
}

/// Verifies count, non-emptiness and a single shared dimension.
pub(crate) fn check_vectors(
    expected: usize,
    vectors: &[Vec<f32>],
    dim: Option<usize>,
) -> Result<(), RagError> {
    if vectors.len() != expected {
        return Err(RagError::Embedding(format!(
            "expected {expected} vectors, got {}",
            vectors.len()
        )));
    }
    let Some(first) = vectors.first() else {
        return Ok(());
    };
    let want = dim.unwrap_or(first.len());
    if want == 0 {
        return Err(RagError::Embedding("empty embedding vector".into()));
    }
    for v in vectors {
        if v.len() != want {
            return Err(RagError::VectorSizeMismatch { got: v.len(), want });
        }
    }
    debug!(count = vectors.len(), dim = want, "embeddings checked");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_mismatch_is_embedding_error() {
        let err = check_vectors(2, &[vec![1.0]], None).unwrap_err();
        assert!(matches!(err, RagError::Embedding(_)));
    }

    #[test]
    fn mixed_dimensions_are_rejected() {
        let err = check_vectors(2, &[vec![1.0, 0.0], vec![1.0]], None).unwrap_err();
        assert!(matches!(err, RagError::VectorSizeMismatch { got: 1, want: 2 }));
    }

    #[test]
    fn configured_dimension_is_enforced() {
        let err = check_vectors(1, &[vec![0.5; 3]], Some(4)).unwrap_err();
        assert!(matches!(err, RagError::VectorSizeMismatch { got: 3, want: 4 }));
        assert!(check_vectors(1, &[vec![0.5; 4]], Some(4)).is_ok());
    }
}
