//! Chat-model seam used by the pipeline stages.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use llm_service::{ChatMessage, LlmServiceProfiles};
use tracing::debug;

use crate::error::PipelineError;

/// Which model profile a stage runs on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelTier {
    /// Cheap, deterministic rewriting (condense).
    Fast,
    /// Final answers.
    Slow,
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Sends `prompt` as a single user message and returns the reply text.
    async fn complete(&self, tier: ModelTier, prompt: &str) -> Result<String, PipelineError>;
}

/// [`ChatModel`] backed by the shared LLM service profiles.
pub struct ProfileModel {
    svc: Arc<LlmServiceProfiles>,
}

impl ProfileModel {
    pub fn new(svc: Arc<LlmServiceProfiles>) -> Self {
        Self { svc }
    }
}

#[async_trait]
impl ChatModel for ProfileModel {
    async fn complete(&self, tier: ModelTier, prompt: &str) -> Result<String, PipelineError> {
        let started = Instant::now();
        let messages = [ChatMessage::user(prompt)];
        let out = match tier {
            ModelTier::Fast => self.svc.chat_fast(&messages).await,
            ModelTier::Slow => self.svc.chat_slow(&messages).await,
        }
        .map_err(|e| PipelineError::Llm(e.to_string()))?;
        debug!(
            ?tier,
            prompt_chars = prompt.len(),
            reply_chars = out.len(),
            latency_ms = started.elapsed().as_millis(),
            "chat model replied"
        );
        Ok(out)
    }
}
