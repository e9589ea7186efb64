use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::turn::{ConversationTurn, SessionId};

/// Keyed storage of conversation histories.
///
/// An unknown or expired session loads as an empty history; expiry is never
/// reported as an error.
#[async_trait]
pub trait SessionStore: Send + Sync {
    fn backend(&self) -> &'static str;

    async fn load(&self, id: &SessionId) -> Result<Vec<ConversationTurn>>;

    /// Replaces the stored history and refreshes its TTL.
    async fn save(&self, id: &SessionId, history: &[ConversationTurn], ttl: Duration) -> Result<()>;

    /// Appends one turn and writes the history back. Not atomic across
    /// concurrent writers of the same session.
    async fn append(
        &self,
        id: &SessionId,
        turn: ConversationTurn,
        ttl: Duration,
    ) -> Result<Vec<ConversationTurn>> {
        let mut history = self.load(id).await?;
        history.push(turn);
        self.save(id, &history, ttl).await?;
        Ok(history)
    }
}
