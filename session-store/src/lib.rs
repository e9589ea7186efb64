//! Conversation memory: ordered per-session history with a TTL.
//!
//! Two backends share the [`SessionStore`] trait: an in-process map for
//! single-node deployments and Redis for anything shared.

mod config;
mod error;
mod memory;
mod redis_store;
mod store;
mod turn;

pub use config::{DEFAULT_KEY_PREFIX, DEFAULT_TTL_SECS, SessionBackend, SessionConfig};
pub use error::{Result, SessionError};
pub use memory::InMemorySessionStore;
pub use redis_store::RedisSessionStore;
pub use store::SessionStore;
pub use turn::{ConversationTurn, SessionId, TurnRole};

use std::sync::Arc;

/// Builds the backend selected by `cfg`.
pub async fn connect(cfg: &SessionConfig) -> Result<Arc<dyn SessionStore>> {
    let store: Arc<dyn SessionStore> = match &cfg.backend {
        SessionBackend::Memory => Arc::new(InMemorySessionStore::new()),
        SessionBackend::Redis { url, key_prefix } => {
            Arc::new(RedisSessionStore::connect(url, key_prefix.clone()).await?)
        }
    };
    tracing::info!(backend = store.backend(), ttl_secs = cfg.ttl.as_secs(), "session store ready");
    Ok(store)
}
