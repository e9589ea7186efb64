//! Shared LLM service: chat completion and embeddings over hosted providers.
//!
//! The crate hides provider wire formats (OpenAI, Anthropic, Ollama) behind
//! [`LlmServiceProfiles`], which exposes three logical profiles:
//!
//! - **fast**      → standalone-question rewriting and other cheap calls
//! - **slow**      → final answers (falls back to `fast` when absent)
//! - **embedding** → batched embedding vectors
//!
//! Provider selection happens once, from configuration, at construction time.

pub mod chat;
pub mod config;
pub mod error_handler;
pub mod service_profiles;
pub mod services;
pub mod telemetry;

pub use chat::{ChatMessage, ChatRole};
pub use config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider};
pub use error_handler::{AiLlmError, ConfigError, HttpError, ProviderError, ProviderErrorKind};
pub use service_profiles::LlmServiceProfiles;
