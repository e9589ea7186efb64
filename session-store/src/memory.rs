use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::trace;

use crate::error::Result;
use crate::store::SessionStore;
use crate::turn::{ConversationTurn, SessionId};

struct Entry {
    history: Vec<ConversationTurn>,
    expires_at: Instant,
}

/// In-process session store. Expired entries are dropped on access and
/// swept from the whole map on every save.
#[derive(Default)]
pub struct InMemorySessionStore {
    entries: RwLock<HashMap<SessionId, Entry>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every expired entry. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        sweep(&mut entries, Instant::now())
    }

    /// Number of stored sessions, expired ones included until swept.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

fn sweep(entries: &mut HashMap<SessionId, Entry>, now: Instant) -> usize {
    let before = entries.len();
    entries.retain(|_, e| e.expires_at > now);
    let removed = before - entries.len();
    if removed > 0 {
        trace!(removed, live = entries.len(), "memory sessions swept");
    }
    removed
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn load(&self, id: &SessionId) -> Result<Vec<ConversationTurn>> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(id) {
                Some(e) if e.expires_at > now => return Ok(e.history.clone()),
                Some(_) => {}
                None => return Ok(Vec::new()),
            }
        }
        trace!(session = %id, "memory session expired");
        let mut entries = self.entries.write().await;
        if entries.get(id).is_some_and(|e| e.expires_at <= now) {
            entries.remove(id);
        }
        Ok(Vec::new())
    }

    async fn save(&self, id: &SessionId, history: &[ConversationTurn], ttl: Duration) -> Result<()> {
        let now = Instant::now();
        let entry = Entry {
            history: history.to_vec(),
            expires_at: now + ttl,
        };
        let mut entries = self.entries.write().await;
        sweep(&mut entries, now);
        entries.insert(id.clone(), entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    #[tokio::test]
    async fn unknown_session_is_empty() {
        let store = InMemorySessionStore::new();
        assert!(store.load(&SessionId::generate()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn append_preserves_order() {
        let store = InMemorySessionStore::new();
        let id = SessionId::parse("s1").unwrap();
        store.append(&id, ConversationTurn::user("hi"), HOUR).await.unwrap();
        store.append(&id, ConversationTurn::assistant("hello"), HOUR).await.unwrap();
        let history = store.load(&id).await.unwrap();
        assert_eq!(
            history,
            vec![ConversationTurn::user("hi"), ConversationTurn::assistant("hello")]
        );
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let store = InMemorySessionStore::new();
        let a = SessionId::parse("a").unwrap();
        let b = SessionId::parse("b").unwrap();
        store.append(&a, ConversationTurn::user("secret"), HOUR).await.unwrap();
        assert!(store.load(&b).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn expired_session_resets_to_empty() {
        let store = InMemorySessionStore::new();
        let id = SessionId::parse("short").unwrap();
        store
            .save(&id, &[ConversationTurn::user("hi")], Duration::from_millis(20))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(store.load(&id).await.unwrap().is_empty());
        assert_eq!(store.purge_expired().await, 0);
    }

    #[tokio::test]
    async fn purge_drops_only_expired() {
        let store = InMemorySessionStore::new();
        store
            .save(&SessionId::parse("old").unwrap(), &[], Duration::from_millis(10))
            .await
            .unwrap();
        store.save(&SessionId::parse("new").unwrap(), &[], HOUR).await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(store.purge_expired().await, 1);
    }

    #[tokio::test]
    async fn save_sweeps_abandoned_sessions() {
        let store = InMemorySessionStore::new();
        for _ in 0..500 {
            store
                .save(&SessionId::generate(), &[ConversationTurn::user("hi")], Duration::from_millis(5))
                .await
                .unwrap();
        }
        assert!(!store.is_empty().await);

        tokio::time::sleep(Duration::from_millis(40)).await;
        let live = SessionId::generate();
        store.save(&live, &[ConversationTurn::user("still here")], HOUR).await.unwrap();

        assert_eq!(store.len().await, 1);
        assert_eq!(store.load(&live).await.unwrap().len(), 1);
    }
}
