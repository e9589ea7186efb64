//! Anthropic (Claude) service for chat completion.
//!
//! - POST {endpoint}/v1/messages: non-streaming message creation
//!
//! System messages are lifted into the top-level `system` field; the
//! remaining turns are sent in order. Anthropic has no embeddings API.

use std::time::Instant;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    chat::{ChatMessage, ChatRole},
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{AiLlmError, ProviderError, ProviderErrorKind},
    services::{build_client, post_json, secret_header, validate_profile},
};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// `max_tokens` is mandatory for the Messages API.
const DEFAULT_MAX_TOKENS: u32 = 1024;

#[derive(Debug)]
pub struct AnthropicService {
    client: reqwest::Client,
    cfg: LlmModelConfig,
    url_messages: String,
}

impl AnthropicService {
    /// Creates a new [`AnthropicService`] from the given config.
    ///
    /// # Errors
    /// Same validation rules as the OpenAI client: provider, API key, endpoint.
    pub fn new(cfg: LlmModelConfig) -> Result<Self, AiLlmError> {
        let base = validate_profile(&cfg, LlmProvider::Anthropic)?;
        let api_key = cfg.api_key.clone().ok_or_else(|| {
            ProviderError::new(LlmProvider::Anthropic, ProviderErrorKind::MissingApiKey)
        })?;

        let mut headers = HeaderMap::new();
        secret_header(
            &mut headers,
            LlmProvider::Anthropic,
            HeaderName::from_static("x-api-key"),
            api_key.trim(),
        )?;
        headers.insert(
            HeaderName::from_static("anthropic-version"),
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );
        let client = build_client(headers, cfg.timeout())?;

        info!(
            provider = %cfg.provider,
            model = %cfg.model,
            endpoint = %cfg.endpoint,
            "AnthropicService initialized"
        );

        Ok(Self {
            client,
            url_messages: format!("{base}/v1/messages"),
            cfg,
        })
    }

    /// Sends the conversation and returns the concatenated text blocks.
    pub async fn chat(&self, messages: &[ChatMessage]) -> Result<String, AiLlmError> {
        let started = Instant::now();
        let body = MessagesRequest::from_messages(&self.cfg, messages);

        let out: MessagesResponse = post_json(
            &self.client,
            LlmProvider::Anthropic,
            &self.url_messages,
            &body,
            self.cfg.timeout(),
        )
        .await?;

        let answer = out
            .content
            .into_iter()
            .filter_map(|block| match block {
                ResponseBlock::Text { text } => Some(text),
                ResponseBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n");

        if answer.trim().is_empty() {
            return Err(
                ProviderError::new(LlmProvider::Anthropic, ProviderErrorKind::EmptyResponse).into(),
            );
        }

        info!(
            model = %self.cfg.model,
            messages = messages.len(),
            latency_ms = started.elapsed().as_millis(),
            "chat completion completed"
        );

        Ok(answer)
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<TurnOut<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

impl<'a> MessagesRequest<'a> {
    fn from_messages(cfg: &'a LlmModelConfig, messages: &'a [ChatMessage]) -> Self {
        let system_parts: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == ChatRole::System)
            .map(|m| m.content.as_str())
            .collect();
        let system = (!system_parts.is_empty()).then(|| system_parts.join("\n\n"));

        let turns = messages
            .iter()
            .filter(|m| m.role != ChatRole::System)
            .map(|m| TurnOut {
                role: m.role.as_str(),
                content: &m.content,
            })
            .collect();

        Self {
            model: &cfg.model,
            max_tokens: cfg.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system,
            messages: turns,
            temperature: cfg.temperature,
            top_p: cfg.top_p,
        }
    }
}

#[derive(Debug, Serialize)]
struct TurnOut<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}
