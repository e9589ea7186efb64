//! Shared LLM service with three active profiles: `fast`, `slow`, and `embedding`.
//!
//! - Lives in the same Tokio runtime as the application.
//! - Construct once, wrap in `Arc`, and pass clones to dependents.
//! - Caches underlying HTTP clients per config (provider+endpoint+model+key+timeout).
//! - If `slow` profile is not provided, it falls back to `fast`.
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use llm_service::{ChatMessage, LlmServiceProfiles};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), llm_service::AiLlmError> {
//! let svc = Arc::new(LlmServiceProfiles::from_env()?);
//!
//! let txt = svc.chat_fast(&[ChatMessage::user("Hello world")]).await?;
//! println!("FAST: {txt}");
//!
//! let vectors = svc.embed_batch(&["Ferris".to_string()]).await?;
//! println!("Embedding dim = {}", vectors[0].len());
//! # Ok(())
//! # }
//! ```

use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;
use tracing::info;

use crate::{
    chat::ChatMessage,
    config::{
        default_config::{config_chat_from_env, config_embedding_from_env},
        llm_model_config::LlmModelConfig,
        llm_provider::LlmProvider,
    },
    error_handler::{AiLlmError, ProviderError, ProviderErrorKind},
    services::{
        anthropic_service::AnthropicService, ollama_service::OllamaService,
        open_ai_service::OpenAiService,
    },
};

/// Shared service that manages three logical LLM profiles: **fast**, **slow**, and **embedding**.
pub struct LlmServiceProfiles {
    fast: LlmModelConfig,
    slow: LlmModelConfig,
    embedding: LlmModelConfig,

    clients: RwLock<HashMap<ClientKey, ProviderClient>>,
}

impl std::fmt::Debug for LlmServiceProfiles {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmServiceProfiles")
            .field("fast", &self.fast.model)
            .field("slow", &self.slow.model)
            .field("embedding", &self.embedding.model)
            .finish()
    }
}

impl LlmServiceProfiles {
    /// Creates a new service with three profiles.
    ///
    /// - `fast`: required fast profile.
    /// - `slow_opt`: optional slow profile. If `None`, falls back to `fast`.
    /// - `embedding`: required embedding profile; its provider must expose embeddings.
    ///
    /// Every client is built eagerly so that bad credentials or endpoints
    /// surface at startup rather than on the first request.
    pub fn new(
        fast: LlmModelConfig,
        slow_opt: Option<LlmModelConfig>,
        embedding: LlmModelConfig,
    ) -> Result<Self, AiLlmError> {
        if !embedding.provider.supports_embeddings() {
            return Err(ProviderError::new(
                embedding.provider,
                ProviderErrorKind::EmbeddingsUnsupported,
            )
            .into());
        }
        let slow = slow_opt.unwrap_or_else(|| fast.clone());

        let mut clients = HashMap::new();
        for cfg in [&fast, &slow, &embedding] {
            let key = ClientKey::from(cfg);
            if !clients.contains_key(&key) {
                clients.insert(key, ProviderClient::build(cfg)?);
            }
        }

        info!(
            fast = %fast.model,
            slow = %slow.model,
            embedding = %embedding.model,
            clients = clients.len(),
            "LlmServiceProfiles ready"
        );

        Ok(Self {
            fast,
            slow,
            embedding,
            clients: RwLock::new(clients),
        })
    }

    /// Builds all profiles from environment variables (see `config::default_config`).
    pub fn from_env() -> Result<Self, AiLlmError> {
        let (fast, slow) = config_chat_from_env()?;
        let embedding = config_embedding_from_env()?;
        Self::new(fast, slow, embedding)
    }

    /// Chat completion using the **fast** profile.
    pub async fn chat_fast(&self, messages: &[ChatMessage]) -> Result<String, AiLlmError> {
        self.chat_with(&self.fast, messages).await
    }

    /// Chat completion using the **slow** profile.
    pub async fn chat_slow(&self, messages: &[ChatMessage]) -> Result<String, AiLlmError> {
        self.chat_with(&self.slow, messages).await
    }

    /// Computes one embedding per input using the **embedding** profile.
    pub async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, AiLlmError> {
        match self.client_for(&self.embedding).await? {
            ProviderClient::OpenAI(cli) => cli.embeddings(inputs).await,
            ProviderClient::Ollama(cli) => cli.embeddings(inputs).await,
            ProviderClient::Anthropic(_) => Err(ProviderError::new(
                LlmProvider::Anthropic,
                ProviderErrorKind::EmbeddingsUnsupported,
            )
            .into()),
        }
    }

    /// Returns references to the current profiles `(fast, slow, embedding)`.
    pub fn profiles(&self) -> (&LlmModelConfig, &LlmModelConfig, &LlmModelConfig) {
        (&self.fast, &self.slow, &self.embedding)
    }

    /* --------------------- Internals --------------------- */

    async fn chat_with(
        &self,
        cfg: &LlmModelConfig,
        messages: &[ChatMessage],
    ) -> Result<String, AiLlmError> {
        match self.client_for(cfg).await? {
            ProviderClient::OpenAI(cli) => cli.chat(messages).await,
            ProviderClient::Anthropic(cli) => cli.chat(messages).await,
            ProviderClient::Ollama(cli) => cli.chat(messages).await,
        }
    }

    async fn client_for(&self, cfg: &LlmModelConfig) -> Result<ProviderClient, AiLlmError> {
        let key = ClientKey::from(cfg);
        if let Some(cli) = self.clients.read().await.get(&key).cloned() {
            return Ok(cli);
        }
        let mut w = self.clients.write().await;
        if let Some(cli) = w.get(&key).cloned() {
            return Ok(cli);
        }
        let cli = ProviderClient::build(cfg)?;
        w.insert(key, cli.clone());
        Ok(cli)
    }
}

/// One cached provider client.
#[derive(Clone, Debug)]
enum ProviderClient {
    OpenAI(Arc<OpenAiService>),
    Anthropic(Arc<AnthropicService>),
    Ollama(Arc<OllamaService>),
}

impl ProviderClient {
    fn build(cfg: &LlmModelConfig) -> Result<Self, AiLlmError> {
        Ok(match cfg.provider {
            LlmProvider::OpenAI => ProviderClient::OpenAI(Arc::new(OpenAiService::new(cfg.clone())?)),
            LlmProvider::Anthropic => {
                ProviderClient::Anthropic(Arc::new(AnthropicService::new(cfg.clone())?))
            }
            LlmProvider::Ollama => ProviderClient::Ollama(Arc::new(OllamaService::new(cfg.clone())?)),
        })
    }
}

/// Internal cache key to identify unique client configs.
#[derive(Clone, PartialEq, Eq, Hash)]
struct ClientKey {
    provider: LlmProvider,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    timeout: Option<u64>,
}

impl From<&LlmModelConfig> for ClientKey {
    fn from(cfg: &LlmModelConfig) -> Self {
        Self {
            provider: cfg.provider,
            endpoint: cfg.endpoint.clone(),
            model: cfg.model.clone(),
            api_key: cfg.api_key.clone(),
            timeout: cfg.timeout_secs,
        }
    }
}
