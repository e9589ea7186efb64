//! Session-backed chat: load history, run the pipeline, write history back.

use std::sync::Arc;
use std::time::Duration;

use session_store::{ConversationTurn, SessionId, SessionStore};
use tracing::{debug, info};

use crate::error::PipelineError;
use crate::pipeline::AnswerPipeline;

/// Result of one chat exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatReply {
    pub response: String,
    /// Full stored history, ending with this exchange.
    pub history: Vec<ConversationTurn>,
    pub conversation_id: SessionId,
}

pub struct ChatService {
    pipeline: Arc<AnswerPipeline>,
    sessions: Arc<dyn SessionStore>,
    ttl: Duration,
}

impl ChatService {
    pub fn new(pipeline: Arc<AnswerPipeline>, sessions: Arc<dyn SessionStore>, ttl: Duration) -> Self {
        Self {
            pipeline,
            sessions,
            ttl,
        }
    }

    /// Runs one exchange in the conversation `conversation_id`.
    ///
    /// A missing id starts a fresh conversation. `seed_history` is used only
    /// when the store has nothing for the conversation. History is written
    /// back once, after the answer exists; a failed exchange stores nothing.
    pub async fn chat(
        &self,
        question: Option<&str>,
        seed_history: Option<Vec<ConversationTurn>>,
        conversation_id: Option<&str>,
    ) -> Result<ChatReply, PipelineError> {
        let question = question.map(str::trim).unwrap_or_default();
        if question.is_empty() {
            return Err(PipelineError::Validation("userQuestion is required".into()));
        }
        let id = match conversation_id {
            Some(raw) => SessionId::parse(raw)?,
            None => SessionId::generate(),
        };

        let mut history = self.sessions.load(&id).await?;
        if history.is_empty() {
            if let Some(seed) = seed_history.filter(|s| !s.is_empty()) {
                debug!(session = %id, turns = seed.len(), "seeding session from request history");
                history = seed;
            }
        }

        let out = self.pipeline.answer(question, &history).await?;

        history.push(ConversationTurn::user(question));
        history.push(ConversationTurn::assistant(out.answer.clone()));
        self.sessions.save(&id, &history, self.ttl).await?;

        info!(
            session = %id,
            backend = self.sessions.backend(),
            turns = history.len(),
            "chat exchange stored"
        );
        Ok(ChatReply {
            response: out.answer,
            history,
            conversation_id: id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::PromptTemplates;
    use crate::test_support::{FailingModel, ScriptedModel, StaticStore};
    use crate::llm::ChatModel;
    use session_store::{InMemorySessionStore, SessionError, TurnRole};

    const HOUR: Duration = Duration::from_secs(3600);

    fn service(model: Arc<dyn ChatModel>, sessions: Arc<dyn SessionStore>) -> ChatService {
        let pipeline = AnswerPipeline::new(
            model,
            Arc::new(StaticStore::new(&["Scrimba teaches coding."])),
            PromptTemplates::defaults("Scrimba", "help@scrimba.com").unwrap(),
            3,
            20,
        );
        ChatService::new(Arc::new(pipeline), sessions, HOUR)
    }

    #[tokio::test]
    async fn two_calls_build_four_turn_history() {
        let svc = service(
            Arc::new(ScriptedModel::new("standalone", "answer")),
            Arc::new(InMemorySessionStore::new()),
        );
        let first = svc.chat(Some("hi"), None, Some("conv-1")).await.unwrap();
        assert_eq!(first.history.len(), 2);

        let second = svc.chat(Some("more?"), None, Some("conv-1")).await.unwrap();
        let roles: Vec<TurnRole> = second.history.iter().map(|t| t.role).collect();
        assert_eq!(
            roles,
            vec![TurnRole::User, TurnRole::Assistant, TurnRole::User, TurnRole::Assistant]
        );
        assert_eq!(second.history[2].content, "more?");
        assert_eq!(second.conversation_id.as_str(), "conv-1");
    }

    #[tokio::test]
    async fn omitted_id_never_sees_other_sessions() {
        let svc = service(
            Arc::new(ScriptedModel::new("s", "a")),
            Arc::new(InMemorySessionStore::new()),
        );
        svc.chat(Some("private"), None, Some("alice")).await.unwrap();

        let anon = svc.chat(Some("hello"), None, None).await.unwrap();
        assert_eq!(anon.history.len(), 2);
        assert!(anon.history.iter().all(|t| t.content != "private"));
        assert_ne!(anon.conversation_id.as_str(), "alice");
    }

    #[tokio::test]
    async fn request_history_seeds_empty_session_only() {
        let sessions = Arc::new(InMemorySessionStore::new());
        let svc = service(Arc::new(ScriptedModel::new("s", "a")), sessions.clone());
        let seed = vec![ConversationTurn::user("earlier"), ConversationTurn::assistant("reply")];

        let out = svc.chat(Some("now"), Some(seed.clone()), Some("c")).await.unwrap();
        assert_eq!(out.history.len(), 4);
        assert_eq!(out.history[0].content, "earlier");

        let again = svc.chat(Some("next"), Some(seed), Some("c")).await.unwrap();
        assert_eq!(again.history.len(), 6);
    }

    #[tokio::test]
    async fn missing_question_is_validation_error() {
        let model = Arc::new(ScriptedModel::new("s", "a"));
        let svc = service(model.clone(), Arc::new(InMemorySessionStore::new()));
        assert!(matches!(svc.chat(None, None, None).await, Err(PipelineError::Validation(_))));
        assert!(matches!(svc.chat(Some(" "), None, None).await, Err(PipelineError::Validation(_))));
        assert!(model.calls().is_empty());
    }

    #[tokio::test]
    async fn invalid_conversation_id_is_rejected() {
        let svc = service(
            Arc::new(ScriptedModel::new("s", "a")),
            Arc::new(InMemorySessionStore::new()),
        );
        let err = svc.chat(Some("q"), None, Some("has space")).await.unwrap_err();
        assert!(matches!(err, PipelineError::Session(SessionError::InvalidId(_))));
    }

    #[tokio::test]
    async fn failed_exchange_stores_nothing() {
        let sessions = Arc::new(InMemorySessionStore::new());
        let svc = service(Arc::new(FailingModel), sessions.clone());
        assert!(svc.chat(Some("q"), None, Some("c")).await.is_err());
        let id = SessionId::parse("c").unwrap();
        assert!(sessions.load(&id).await.unwrap().is_empty());
    }
}
