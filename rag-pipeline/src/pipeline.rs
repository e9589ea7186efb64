//! Condense -> Retrieve -> Assemble -> Answer.

use std::sync::Arc;
use std::time::Instant;

use rag_store::{RetrievedChunk, VectorStore};
use session_store::ConversationTurn;
use tracing::{info, warn};

use crate::error::PipelineError;
use crate::llm::{ChatModel, ModelTier};
use crate::prompt::{PromptTemplates, assemble_context, format_history};

/// Outcome of one pipeline run.
#[derive(Clone, Debug)]
pub struct PipelineAnswer {
    pub answer: String,
    pub standalone_question: String,
    /// Chunks fed to the answer prompt, most similar first.
    pub context: Vec<RetrievedChunk>,
}

/// Stateless between calls; all conversation state comes in as `history`.
pub struct AnswerPipeline {
    model: Arc<dyn ChatModel>,
    store: Arc<dyn VectorStore>,
    prompts: PromptTemplates,
    top_k: usize,
    history_max_turns: usize,
}

impl AnswerPipeline {
    pub fn new(
        model: Arc<dyn ChatModel>,
        store: Arc<dyn VectorStore>,
        prompts: PromptTemplates,
        top_k: usize,
        history_max_turns: usize,
    ) -> Self {
        Self {
            model,
            store,
            prompts,
            top_k,
            history_max_turns,
        }
    }

    /// Answers `question` given the prior turns of the conversation.
    ///
    /// Any stage failure aborts the run; no partial answer is produced.
    ///
    /// # Errors
    /// `Validation` for a blank question, `Llm` for model failures and
    /// `Rag` for embedding or retrieval failures.
    pub async fn answer(
        &self,
        question: &str,
        history: &[ConversationTurn],
    ) -> Result<PipelineAnswer, PipelineError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(PipelineError::Validation("userQuestion is empty".into()));
        }
        let started = Instant::now();
        let history_text = format_history(history, self.history_max_turns);

        // 1) Condense
        let stage = Instant::now();
        let rewritten = self
            .model
            .complete(
                ModelTier::Fast,
                &self.prompts.standalone_prompt(question, &history_text),
            )
            .await?;
        let standalone_question = match rewritten.trim() {
            "" => {
                warn!("condense returned an empty question, retrieving with the original");
                question.to_string()
            }
            s => s.to_string(),
        };
        info!(
            stage = "condense",
            history_turns = history.len(),
            latency_ms = stage.elapsed().as_millis(),
            "standalone question ready"
        );

        // 2) Retrieve
        let stage = Instant::now();
        let context = self.store.retrieve(&standalone_question, self.top_k).await?;
        info!(
            stage = "retrieve",
            backend = self.store.backend(),
            k = self.top_k,
            hits = context.len(),
            latency_ms = stage.elapsed().as_millis(),
            "context retrieved"
        );

        // 3) Assemble
        let context_text = assemble_context(&context);

        // 4) Answer, with the original question
        let stage = Instant::now();
        let answer = self
            .model
            .complete(
                ModelTier::Slow,
                &self
                    .prompts
                    .answer_prompt(&context_text, &history_text, question),
            )
            .await?;
        info!(
            stage = "answer",
            answer_chars = answer.len(),
            latency_ms = stage.elapsed().as_millis(),
            total_ms = started.elapsed().as_millis(),
            "answer ready"
        );

        Ok(PipelineAnswer {
            answer: answer.trim().to_string(),
            standalone_question,
            context,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FailingModel, ScriptedModel, StaticStore};
    use rag_store::RagError;

    fn pipeline(model: Arc<dyn ChatModel>, store: Arc<dyn VectorStore>) -> AnswerPipeline {
        AnswerPipeline::new(
            model,
            store,
            PromptTemplates::defaults("Scrimba", "help@scrimba.com").unwrap(),
            3,
            20,
        )
    }

    #[tokio::test]
    async fn stages_run_in_order_with_expected_prompts() {
        let model = Arc::new(ScriptedModel::new("What is the refund policy?", "30 days."));
        let store = Arc::new(StaticStore::new(&["Refunds within 30 days.", "Email help@scrimba.com."]));
        let p = pipeline(model.clone(), store.clone());

        let history = vec![
            ConversationTurn::user("Hi"),
            ConversationTurn::assistant("Hello!"),
        ];
        let out = p.answer("  and refunds?  ", &history).await.unwrap();
        assert_eq!(out.answer, "30 days.");
        assert_eq!(out.standalone_question, "What is the refund policy?");
        assert_eq!(out.context.len(), 2);

        let calls = model.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, ModelTier::Fast);
        assert!(calls[0].1.contains("user: Hi\nassistant: Hello!"));
        assert!(calls[0].1.contains("question: and refunds?"));

        assert_eq!(calls[1].0, ModelTier::Slow);
        assert!(calls[1].1.contains("Refunds within 30 days.\n\n\n\nEmail help@scrimba.com."));
        // The answer prompt sees the original question, retrieval the rewritten one.
        assert!(calls[1].1.contains("question: and refunds?"));
        assert_eq!(store.queries(), vec![("What is the refund policy?".to_string(), 3)]);
    }

    #[tokio::test]
    async fn empty_question_fails_before_any_call() {
        let model = Arc::new(ScriptedModel::new("x", "y"));
        let store = Arc::new(StaticStore::new(&[]));
        let err = pipeline(model.clone(), store).answer("   ", &[]).await.unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
        assert!(model.calls().is_empty());
    }

    #[tokio::test]
    async fn empty_store_still_answers() {
        let model = Arc::new(ScriptedModel::new("q", "I'm sorry, I don't know the answer to that."));
        let p = pipeline(model.clone(), Arc::new(StaticStore::new(&[])));
        let out = p.answer("Who are you?", &[]).await.unwrap();
        assert!(out.context.is_empty());
        assert!(model.calls()[1].1.contains("context: \n"));
    }

    #[tokio::test]
    async fn blank_condense_output_falls_back_to_question() {
        let model = Arc::new(ScriptedModel::new("   ", "ok"));
        let store = Arc::new(StaticStore::new(&["a"]));
        pipeline(model, store.clone()).answer("pricing?", &[]).await.unwrap();
        assert_eq!(store.queries()[0].0, "pricing?");
    }

    #[tokio::test]
    async fn model_failure_is_llm_error() {
        let p = pipeline(Arc::new(FailingModel), Arc::new(StaticStore::new(&["a"])));
        assert!(matches!(p.answer("q", &[]).await, Err(PipelineError::Llm(_))));
    }

    #[tokio::test]
    async fn retrieval_failure_aborts() {
        let model = Arc::new(ScriptedModel::new("q", "a"));
        let store = Arc::new(StaticStore::failing());
        let err = pipeline(model.clone(), store).answer("q", &[]).await.unwrap_err();
        assert!(matches!(err, PipelineError::Rag(RagError::Retrieval(_))));
        assert_eq!(model.calls().len(), 1);
    }
}
