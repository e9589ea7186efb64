//! Conversation turns and session identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, SessionError};

const MAX_ID_LEN: usize = 128;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    /// Older clients send `bot` for the assistant side.
    #[serde(alias = "bot")]
    Assistant,
}

impl TurnRole {
    pub fn as_str(self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Assistant => "assistant",
        }
    }
}

impl fmt::Display for TurnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message in a conversation. Never mutated once appended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
        }
    }
}

/// Opaque conversation token chosen by the caller or generated here.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(String);

impl SessionId {
    /// A fresh random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Accepts any non-blank token up to 128 chars without whitespace.
    pub fn parse(raw: &str) -> Result<Self> {
        let id = raw.trim();
        if id.is_empty() {
            return Err(SessionError::InvalidId("empty".into()));
        }
        if id.chars().count() > MAX_ID_LEN {
            return Err(SessionError::InvalidId(format!("longer than {MAX_ID_LEN} chars")));
        }
        if id.chars().any(char::is_whitespace) {
            return Err(SessionError::InvalidId("contains whitespace".into()));
        }
        Ok(Self(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bot_is_accepted_as_assistant() {
        let turn: ConversationTurn = serde_json::from_str(r#"{"role":"bot","content":"hi"}"#).unwrap();
        assert_eq!(turn.role, TurnRole::Assistant);
        let out = serde_json::to_string(&turn).unwrap();
        assert_eq!(out, r#"{"role":"assistant","content":"hi"}"#);
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert!(serde_json::from_str::<ConversationTurn>(r#"{"role":"system","content":"x"}"#).is_err());
    }

    #[test]
    fn session_ids_are_validated() {
        assert_eq!(SessionId::parse("  abc-123 ").unwrap().as_str(), "abc-123");
        assert!(SessionId::parse("   ").is_err());
        assert!(SessionId::parse("a b").is_err());
        assert!(SessionId::parse(&"x".repeat(129)).is_err());
        assert_ne!(SessionId::generate(), SessionId::generate());
    }
}
