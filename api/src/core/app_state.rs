use std::sync::Arc;

use llm_service::LlmServiceProfiles;
use rag_pipeline::{AnswerPipeline, ChatService, PipelineConfig, ProfileModel, PromptTemplates};
use rag_store::{KnowledgeSource, RagConfig, RagStore, ServiceEmbedder};
use session_store::SessionConfig;
use tracing::info;

use crate::error_handler::AppError;

/// Shared state for all HTTP handlers.
pub struct AppState {
    /// Vector store used by `/init`.
    pub rag: RagStore,
    /// What `/init` loads.
    pub knowledge: KnowledgeSource,
    /// Session-backed answer pipeline used by `/chat`.
    pub chat: ChatService,
}

impl AppState {
    pub fn new(rag: RagStore, knowledge: KnowledgeSource, chat: ChatService) -> Self {
        Self {
            rag,
            knowledge,
            chat,
        }
    }

    /// Wires every collaborator from environment variables.
    ///
    /// # Errors
    /// Any missing or invalid setting surfaces as [`AppError::Config`].
    pub async fn from_env() -> Result<Self, AppError> {
        let svc = Arc::new(LlmServiceProfiles::from_env()?);

        let rag_cfg = RagConfig::from_env()?;
        let embedder = Arc::new(ServiceEmbedder::new(svc.clone(), rag_cfg.embedding_dim));
        let rag = RagStore::new(&rag_cfg, embedder).await?;
        let knowledge = KnowledgeSource::from_env()?;

        let pcfg = PipelineConfig::from_env()?;
        let prompts = PromptTemplates::load(
            pcfg.standalone_template_path.as_deref(),
            pcfg.answer_template_path.as_deref(),
            &pcfg.bot_subject,
            &pcfg.support_email,
        )
        .await?;
        let pipeline = AnswerPipeline::new(
            Arc::new(ProfileModel::new(svc)),
            rag.store(),
            prompts,
            pcfg.top_k,
            pcfg.history_max_turns,
        );

        let scfg = SessionConfig::from_env()?;
        let sessions = session_store::connect(&scfg).await?;
        let chat = ChatService::new(Arc::new(pipeline), sessions, scfg.ttl);

        info!(
            vector_db = rag_cfg.backend.name(),
            knowledge = %knowledge.path.display(),
            top_k = pcfg.top_k,
            "application state ready"
        );
        Ok(Self::new(rag, knowledge, chat))
    }
}
