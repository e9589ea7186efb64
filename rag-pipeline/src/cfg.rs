//! Runtime configuration loaded from environment variables.

use std::path::PathBuf;
use std::str::FromStr;

use crate::error::PipelineError;

pub const DEFAULT_TOP_K: usize = 3;
pub const DEFAULT_HISTORY_MAX_TURNS: usize = 20;
pub const DEFAULT_BOT_SUBJECT: &str = "Scrimba";
pub const DEFAULT_SUPPORT_EMAIL: &str = "help@scrimba.com";

/// Config bag for the pipeline. All fields have defaults via `from_env`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Chunks retrieved per question.
    pub top_k: usize,
    /// Most recent turns rendered into prompts; `0` renders all.
    pub history_max_turns: usize,
    /// What the bot answers questions about.
    pub bot_subject: String,
    /// Where the decline message points users.
    pub support_email: String,
    pub standalone_template_path: Option<PathBuf>,
    pub answer_template_path: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            history_max_turns: DEFAULT_HISTORY_MAX_TURNS,
            bot_subject: DEFAULT_BOT_SUBJECT.into(),
            support_email: DEFAULT_SUPPORT_EMAIL.into(),
            standalone_template_path: None,
            answer_template_path: None,
        }
    }
}

impl PipelineConfig {
    /// Build from environment variables with sensible defaults.
    pub fn from_env() -> Result<Self, PipelineError> {
        let d = Self::default();
        let cfg = Self {
            top_k: parse("RAG_TOP_K")?.unwrap_or(d.top_k),
            history_max_turns: parse("HISTORY_MAX_TURNS")?.unwrap_or(d.history_max_turns),
            bot_subject: env_opt("BOT_SUBJECT").unwrap_or(d.bot_subject),
            support_email: env_opt("SUPPORT_EMAIL").unwrap_or(d.support_email),
            standalone_template_path: env_opt("PROMPT_STANDALONE_PATH").map(PathBuf::from),
            answer_template_path: env_opt("PROMPT_ANSWER_PATH").map(PathBuf::from),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.top_k == 0 {
            return Err(PipelineError::Config("RAG_TOP_K must be >= 1".into()));
        }
        Ok(())
    }
}

fn env_opt(k: &str) -> Option<String> {
    std::env::var(k).ok().filter(|v| !v.trim().is_empty())
}

fn parse<T: FromStr>(k: &str) -> Result<Option<T>, PipelineError>
where
    T::Err: std::fmt::Display,
{
    env_opt(k)
        .map(|v| {
            v.trim()
                .parse()
                .map_err(|e| PipelineError::Config(format!("{k}='{v}': {e}")))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_observed_behaviour() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.top_k, 3);
        assert_eq!(cfg.support_email, "help@scrimba.com");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_top_k_is_rejected() {
        let cfg = PipelineConfig {
            top_k: 0,
            ..PipelineConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(PipelineError::Config(_))));
    }
}
