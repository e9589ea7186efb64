//! Default LLM configs loaded strictly from environment variables.
//!
//! This module provides convenience constructors for [`LlmModelConfig`],
//! grouped by role:
//!
//! - **Chat** → the provider named by `AI_MODEL` (fast profile, plus an
//!   optional slow profile when a dedicated fast model is configured)
//! - **Embedding** → the provider named by `EMBEDDING_PROVIDER`
//!
//! # Environment variables
//!
//! Common:
//! - `AI_MODEL`            = chat provider (`open_ai`, `anthropic`, `ollama`; default `open_ai`)
//! - `EMBEDDING_PROVIDER`  = embedding provider (`open_ai`, `ollama`; default `open_ai`)
//! - `LLM_MAX_TOKENS`      = optional max tokens (u32)
//! - `LLM_TIMEOUT_SECS`    = optional request timeout (u64)
//!
//! OpenAI:    `OPENAI_API_KEY` (mandatory), `OPENAI_MODEL`, `OPENAI_MODEL_FAST`, `OPENAI_URL`
//! Anthropic: `ANTHROPIC_API_KEY` (mandatory), `ANTHROPIC_MODEL`, `ANTHROPIC_MODEL_FAST`, `ANTHROPIC_URL`
//! Ollama:    `OLLAMA_URL` or `OLLAMA_PORT` (mandatory), `OLLAMA_MODEL` (mandatory), `OLLAMA_MODEL_FAST`
//! Embedding: `EMBEDDING_MODEL` (mandatory for Ollama)

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{
        AiLlmError, ConfigError, env_opt, env_opt_u32, env_opt_u64, env_or, must_env,
        validate_http_endpoint,
    },
};

pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com";
pub const DEFAULT_OPENAI_CHAT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_OPENAI_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
pub const DEFAULT_ANTHROPIC_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-20240620";

/// Resolves the Ollama endpoint strictly from environment.
///
/// Precedence:
/// 1. `OLLAMA_URL` if present and non-empty
/// 2. `OLLAMA_PORT` → `http://localhost:{port}`
fn ollama_endpoint() -> Result<String, AiLlmError> {
    if let Some(url) = env_opt("OLLAMA_URL") {
        validate_http_endpoint("OLLAMA_URL", &url)?;
        return Ok(url);
    }
    if let Some(port) = env_opt("OLLAMA_PORT") {
        port.parse::<u16>().map_err(|_| ConfigError::InvalidNumber {
            var: "OLLAMA_PORT",
            reason: "expected u16 (1..=65535)",
        })?;
        return Ok(format!("http://localhost:{port}"));
    }
    Err(ConfigError::MissingVar("OLLAMA_URL or OLLAMA_PORT").into())
}

/// Provider-level connection settings shared by every profile of that provider.
struct Connection {
    endpoint: String,
    api_key: Option<String>,
}

fn connection(provider: LlmProvider) -> Result<Connection, AiLlmError> {
    match provider {
        LlmProvider::OpenAI => {
            let endpoint = env_or("OPENAI_URL", DEFAULT_OPENAI_URL);
            validate_http_endpoint("OPENAI_URL", &endpoint)?;
            Ok(Connection {
                endpoint,
                api_key: Some(must_env("OPENAI_API_KEY")?),
            })
        }
        LlmProvider::Anthropic => {
            let endpoint = env_or("ANTHROPIC_URL", DEFAULT_ANTHROPIC_URL);
            validate_http_endpoint("ANTHROPIC_URL", &endpoint)?;
            Ok(Connection {
                endpoint,
                api_key: Some(must_env("ANTHROPIC_API_KEY")?),
            })
        }
        LlmProvider::Ollama => Ok(Connection {
            endpoint: ollama_endpoint()?,
            api_key: None,
        }),
    }
}

fn provider_from_env(var: &'static str) -> Result<LlmProvider, AiLlmError> {
    Ok(env_or(var, "open_ai").parse::<LlmProvider>()?)
}

/// Chat profiles selected by `AI_MODEL`.
///
/// Returns `(fast, slow)`. When `<PROVIDER>_MODEL_FAST` is set the fast
/// profile uses it and the main model becomes the slow profile; otherwise the
/// main model serves both and `slow` is `None`.
///
/// # Defaults
/// - fast: `temperature = Some(0.0)` (rewrites should be deterministic)
/// - slow: `temperature = Some(0.7)`
pub fn config_chat_from_env() -> Result<(LlmModelConfig, Option<LlmModelConfig>), AiLlmError> {
    let provider = provider_from_env("AI_MODEL")?;
    let conn = connection(provider)?;
    let max_tokens = env_opt_u32("LLM_MAX_TOKENS")?;
    let timeout_secs = env_opt_u64("LLM_TIMEOUT_SECS")?;

    let (main_model, fast_model) = match provider {
        LlmProvider::OpenAI => (
            env_or("OPENAI_MODEL", DEFAULT_OPENAI_CHAT_MODEL),
            env_opt("OPENAI_MODEL_FAST"),
        ),
        LlmProvider::Anthropic => (
            env_or("ANTHROPIC_MODEL", DEFAULT_ANTHROPIC_MODEL),
            env_opt("ANTHROPIC_MODEL_FAST"),
        ),
        LlmProvider::Ollama => (must_env("OLLAMA_MODEL")?, env_opt("OLLAMA_MODEL_FAST")),
    };

    let profile = |model: String, temperature: f32| LlmModelConfig {
        provider,
        model,
        endpoint: conn.endpoint.clone(),
        api_key: conn.api_key.clone(),
        max_tokens,
        temperature: Some(temperature),
        top_p: None,
        timeout_secs,
    };

    Ok(match fast_model {
        Some(fast) => (profile(fast, 0.0), Some(profile(main_model, 0.7))),
        None => (profile(main_model, 0.7), None),
    })
}

/// Embedding profile selected by `EMBEDDING_PROVIDER`.
///
/// # Errors
/// - [`ConfigError::UnsupportedProvider`] for providers without embeddings
/// - [`ConfigError::MissingVar`] when the provider credentials are absent
pub fn config_embedding_from_env() -> Result<LlmModelConfig, AiLlmError> {
    let provider = provider_from_env("EMBEDDING_PROVIDER")?;
    if !provider.supports_embeddings() {
        return Err(ConfigError::UnsupportedProvider(format!("{provider} (embeddings)")).into());
    }
    let conn = connection(provider)?;
    let model = match provider {
        LlmProvider::Ollama => must_env("EMBEDDING_MODEL")?,
        _ => env_or("EMBEDDING_MODEL", DEFAULT_OPENAI_EMBEDDING_MODEL),
    };

    Ok(LlmModelConfig {
        provider,
        model,
        endpoint: conn.endpoint,
        api_key: conn.api_key,
        max_tokens: None,
        temperature: None,
        top_p: None,
        timeout_secs: env_opt_u64("LLM_TIMEOUT_SECS")?,
    })
}
