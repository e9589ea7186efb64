use std::{fmt, str::FromStr};

use crate::error_handler::ConfigError;

/// Represents the provider (backend) used for chat completion or embeddings.
///
/// Parsed once from configuration (`AI_MODEL`, `EMBEDDING_PROVIDER`) and
/// carried inside [`LlmModelConfig`](super::llm_model_config::LlmModelConfig).
///
/// # Examples
///
/// ```
/// use llm_service::LlmProvider;
///
/// let p: LlmProvider = "open_ai".parse().unwrap();
/// assert_eq!(p, LlmProvider::OpenAI);
/// assert!(!LlmProvider::Anthropic.supports_embeddings());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LlmProvider {
    /// OpenAI REST API (chat completions + embeddings).
    OpenAI,
    /// Anthropic Messages API (chat only).
    Anthropic,
    /// Local Ollama runtime (chat + embeddings).
    Ollama,
}

impl LlmProvider {
    /// Whether the provider exposes an embeddings endpoint.
    pub fn supports_embeddings(self) -> bool {
        !matches!(self, LlmProvider::Anthropic)
    }
}

impl FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open_ai" | "openai" | "chatgpt" => Ok(LlmProvider::OpenAI),
            "anthropic" | "claude" => Ok(LlmProvider::Anthropic),
            "ollama" => Ok(LlmProvider::Ollama),
            other => Err(ConfigError::UnsupportedProvider(other.to_string())),
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LlmProvider::OpenAI => "open_ai",
            LlmProvider::Anthropic => "anthropic",
            LlmProvider::Ollama => "ollama",
        };
        f.write_str(name)
    }
}
