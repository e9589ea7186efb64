use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::{debug, info};

use crate::error::{Result, SessionError};
use crate::store::SessionStore;
use crate::turn::{ConversationTurn, SessionId};

/// Redis-backed sessions: one JSON string per conversation, written with
/// `SET ... EX ttl` so every save refreshes the expiry.
#[derive(Clone)]
pub struct RedisSessionStore {
    conn: ConnectionManager,
    key_prefix: String,
}

impl RedisSessionStore {
    pub async fn connect(url: &str, key_prefix: impl Into<String>) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| SessionError::Config(format!("REDIS_URL: {e}")))?;
        let conn = ConnectionManager::new(client).await?;
        let key_prefix = key_prefix.into();
        info!(prefix = %key_prefix, "redis session store connected");
        Ok(Self { conn, key_prefix })
    }

    fn key(&self, id: &SessionId) -> String {
        session_key(&self.key_prefix, id)
    }
}

fn session_key(prefix: &str, id: &SessionId) -> String {
    format!("{prefix}{id}")
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    fn backend(&self) -> &'static str {
        "redis"
    }

    async fn load(&self, id: &SessionId) -> Result<Vec<ConversationTurn>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(self.key(id)).await?;
        match raw {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => {
                debug!(session = %id, "redis session missing or expired");
                Ok(Vec::new())
            }
        }
    }

    async fn save(&self, id: &SessionId, history: &[ConversationTurn], ttl: Duration) -> Result<()> {
        let json = serde_json::to_string(history)?;
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(self.key(id), json, ttl.as_secs().max(1)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_prefixed() {
        let id = SessionId::parse("abc").unwrap();
        assert_eq!(session_key("chat:session:", &id), "chat:session:abc");
    }
}
