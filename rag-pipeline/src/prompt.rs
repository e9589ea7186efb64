//! Prompt templates, history formatting and context assembly.

use std::path::Path;

use rag_store::RetrievedChunk;
use session_store::ConversationTurn;

use crate::error::PipelineError;

/// Separator placed between retrieved chunks in the context block.
pub const CONTEXT_DELIMITER: &str = "\n\n\n\n";

/// Rewrites a follow-up question into one that stands on its own.
pub const DEFAULT_STANDALONE_TEMPLATE: &str = "Given some conversation history (if any) and a question, convert the question to a standalone question. 
  conversation history: {conversation_history}
  question: {question} 
  standalone question: ";

/// Final answer. `{subject}` and `{support_email}` are filled once at load.
pub const DEFAULT_ANSWER_TEMPLATE: &str = "You are a helpful and enthusiastic support bot who can answer a given question about {subject} based on the context provided and the conversation history provided. Try to find the answer in the context. If the answer is not given in the context, find the answer in the conversation history if possible and reply using the information in the user questions but rephrasing it with your own words. If you really don't know the answer, say \"I'm sorry, I don't know the answer to that.\" And direct the questioner to email {support_email}. Don't try to make up an answer. Always speak as if you were chatting to a friend.
  context: {context}
  conversation history: {conversation_history}
  question: {question}
  answer: ";

const STANDALONE_VARS: [&str; 2] = ["conversation_history", "question"];
const ANSWER_VARS: [&str; 3] = ["context", "conversation_history", "question"];

/// Validated pair of instruction templates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptTemplates {
    standalone: String,
    answer: String,
}

impl PromptTemplates {
    /// Fills the branding placeholders and checks that every per-request
    /// placeholder is present.
    pub fn new(
        standalone: &str,
        answer: &str,
        subject: &str,
        support_email: &str,
    ) -> Result<Self, PipelineError> {
        let brand = [("subject", subject), ("support_email", support_email)];
        let standalone = render(standalone, &brand);
        let answer = render(answer, &brand);
        require_placeholders("standalone", &standalone, &STANDALONE_VARS)?;
        require_placeholders("answer", &answer, &ANSWER_VARS)?;
        Ok(Self { standalone, answer })
    }

    pub fn defaults(subject: &str, support_email: &str) -> Result<Self, PipelineError> {
        Self::new(
            DEFAULT_STANDALONE_TEMPLATE,
            DEFAULT_ANSWER_TEMPLATE,
            subject,
            support_email,
        )
    }

    /// Loads templates from optional files, falling back to the built-ins.
    pub async fn load(
        standalone_path: Option<&Path>,
        answer_path: Option<&Path>,
        subject: &str,
        support_email: &str,
    ) -> Result<Self, PipelineError> {
        let standalone = read_or(standalone_path, DEFAULT_STANDALONE_TEMPLATE).await?;
        let answer = read_or(answer_path, DEFAULT_ANSWER_TEMPLATE).await?;
        Self::new(&standalone, &answer, subject, support_email)
    }

    pub fn standalone_prompt(&self, question: &str, history: &str) -> String {
        render(
            &self.standalone,
            &[("conversation_history", history), ("question", question)],
        )
    }

    pub fn answer_prompt(&self, context: &str, history: &str, question: &str) -> String {
        render(
            &self.answer,
            &[
                ("context", context),
                ("conversation_history", history),
                ("question", question),
            ],
        )
    }
}

async fn read_or(path: Option<&Path>, fallback: &str) -> Result<String, PipelineError> {
    match path {
        Some(p) => tokio::fs::read_to_string(p)
            .await
            .map_err(|source| PipelineError::Io {
                path: p.to_path_buf(),
                source,
            }),
        None => Ok(fallback.to_string()),
    }
}

fn require_placeholders(name: &str, template: &str, vars: &[&str]) -> Result<(), PipelineError> {
    let missing: Vec<&str> = vars
        .iter()
        .copied()
        .filter(|v| !template.contains(&format!("{{{v}}}")))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::Config(format!(
            "{name} template is missing placeholders: {}",
            missing.join(", ")
        )))
    }
}

/// Single-pass `{name}` substitution. Unknown placeholders are left as is and
/// substituted values are never re-expanded.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after.find('}').and_then(|close| {
            let name = &after[..close];
            vars.iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| (*v, close))
        });
        match value {
            Some((v, close)) => {
                out.push_str(v);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// `role: content` lines, oldest first, limited to the last `max_turns`
/// turns (`0` keeps everything).
pub fn format_history(history: &[ConversationTurn], max_turns: usize) -> String {
    let start = if max_turns == 0 {
        0
    } else {
        history.len().saturating_sub(max_turns)
    };
    history[start..]
        .iter()
        .map(|t| format!("{}: {}", t.role, t.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Joins chunk contents in ranked order.
pub fn assemble_context(hits: &[RetrievedChunk]) -> String {
    hits.iter()
        .map(|h| h.chunk.content.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_DELIMITER)
}
