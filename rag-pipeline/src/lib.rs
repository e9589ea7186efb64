//! Retrieval-augmented answering with conversational memory.
//!
//! [`AnswerPipeline`] runs the four stages for a single question:
//!
//! 1. **Condense**  → rewrite the question as a standalone one (fast model)
//! 2. **Retrieve**  → top-K chunks from the vector store
//! 3. **Assemble**  → join chunks into one context block
//! 4. **Answer**    → final reply from context, history and the original question (slow model)
//!
//! [`ChatService`] wraps the pipeline with session load/save.

mod cfg;
mod chat;
mod error;
mod llm;
mod pipeline;
mod prompt;

pub use cfg::PipelineConfig;
pub use chat::{ChatReply, ChatService};
pub use error::PipelineError;
pub use llm::{ChatModel, ModelTier, ProfileModel};
pub use pipeline::{AnswerPipeline, PipelineAnswer};
pub use prompt::{
    CONTEXT_DELIMITER, DEFAULT_ANSWER_TEMPLATE, DEFAULT_STANDALONE_TEMPLATE, PromptTemplates,
    assemble_context, format_history,
};
