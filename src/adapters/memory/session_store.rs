//! In-memory session store implementation.
//!
//! Uses a HashMap behind a single reader/writer lock. Suitable for
//! single-process deployments; state is discarded on process exit.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{SessionId, Timestamp};
use crate::domain::session::{Session, SessionStoreError};
use crate::ports::SessionStore;

/// Default entry lifetime, matching the session cookie's max-age (7 days).
pub const DEFAULT_TTL_SECS: u64 = 604_800;

/// In-memory session registry.
///
/// Lookups take a shared lock; registration and removal take an exclusive
/// lock. Each session's data bag carries its own independent lock, so
/// mutating session state never contends on the store lock. No lock is held
/// across an await point or any I/O.
///
/// Entries expire a fixed TTL after creation, checked lazily on lookup; an
/// expired entry is dropped and reported as absent. There is no background
/// sweeper.
#[derive(Debug)]
pub struct InMemorySessionStore {
    /// Entry lifetime from creation; `None` disables expiry.
    ttl_secs: Option<u64>,
    /// Registered sessions keyed by id.
    sessions: Arc<RwLock<HashMap<SessionId, StoredEntry>>>,
}

/// One registered session plus its expiry deadline.
#[derive(Debug, Clone)]
struct StoredEntry {
    session: Session,
    expires_at: Option<Timestamp>,
}

impl StoredEntry {
    fn is_expired(&self, now: Timestamp) -> bool {
        matches!(self.expires_at, Some(deadline) if !now.is_before(&deadline))
    }
}

impl InMemorySessionStore {
    /// Creates a store with the default 7-day TTL.
    pub fn new() -> Self {
        Self::with_ttl_secs(Some(DEFAULT_TTL_SECS))
    }

    /// Creates a store with the given entry lifetime; `None` disables expiry.
    pub fn with_ttl_secs(ttl_secs: Option<u64>) -> Self {
        Self {
            ttl_secs,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of live entries. Expired-but-unswept entries are counted.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Returns whether the store holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    fn entry_for(&self, session: Session, now: Timestamp) -> StoredEntry {
        StoredEntry {
            session,
            expires_at: self.ttl_secs.map(|secs| now.plus_secs(secs)),
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, id: &SessionId) -> Result<Option<Session>, SessionStoreError> {
        let now = Timestamp::now();
        {
            let sessions = self.sessions.read().await;
            match sessions.get(id) {
                Some(entry) if !entry.is_expired(now) => {
                    return Ok(Some(entry.session.clone()))
                }
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // Lazy expiry: re-check under the write lock before dropping the
        // entry, since another writer may have replaced it in between.
        let mut sessions = self.sessions.write().await;
        if let Some(entry) = sessions.get(id) {
            if entry.is_expired(now) {
                sessions.remove(id);
                tracing::debug!(session_id = %id, "expired session dropped");
            } else {
                return Ok(Some(entry.session.clone()));
            }
        }
        Ok(None)
    }

    async fn insert(&self, session: Session) -> Result<(), SessionStoreError> {
        let entry = self.entry_for(session, Timestamp::now());
        let mut sessions = self.sessions.write().await;
        sessions.insert(entry.session.id(), entry);
        Ok(())
    }

    async fn remove(&self, id: &SessionId) -> Result<(), SessionStoreError> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(id);
        Ok(())
    }

    fn create(&self) -> Session {
        Session::new()
    }

    async fn get_or_create(
        &self,
        presented: Option<SessionId>,
    ) -> Result<(Session, bool), SessionStoreError> {
        let now = Timestamp::now();

        // Single critical section across lookup and create, so concurrent
        // calls with the same known id resolve to one session.
        let mut sessions = self.sessions.write().await;

        if let Some(id) = presented {
            match sessions.get(&id) {
                Some(entry) if !entry.is_expired(now) => {
                    return Ok((entry.session.clone(), true));
                }
                Some(_) => {
                    sessions.remove(&id);
                    tracing::debug!(session_id = %id, "expired session dropped");
                }
                None => {}
            }
        }

        // The presented id (if any) is discarded: the store only ever indexes
        // ids it minted itself.
        let session = Session::new();
        let entry = self.entry_for(session.clone(), now);
        sessions.insert(session.id(), entry);
        tracing::debug!(session_id = %session.id(), "session created");
        Ok((session, false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn insert_then_get_returns_session() {
        let store = InMemorySessionStore::new();
        let session = store.create();
        let id = session.id();
        store.insert(session).await.unwrap();

        let found = store.get(&id).await.unwrap().expect("session registered");
        assert_eq!(found.id(), id);
    }

    #[tokio::test]
    async fn unknown_id_is_absent_not_error() {
        let store = InMemorySessionStore::new();
        assert!(store.get(&SessionId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn create_does_not_register() {
        let store = InMemorySessionStore::new();
        let session = store.create();
        assert!(store.get(&session.id()).await.unwrap().is_none());
        assert!(store.is_empty().await);

        store.insert(session.clone()).await.unwrap();
        assert!(store.get(&session.id()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let store = InMemorySessionStore::new();
        let session = store.create();
        let id = session.id();
        store.insert(session).await.unwrap();

        store.remove(&id).await.unwrap();
        assert!(store.get(&id).await.unwrap().is_none());

        // Removing an absent id is a no-op.
        store.remove(&id).await.unwrap();
    }

    #[tokio::test]
    async fn insert_replaces_existing_entry() {
        let store = InMemorySessionStore::new();
        let session = store.create();
        let id = session.id();
        session.set("user", json!("alice"));
        store.insert(session.clone()).await.unwrap();
        store.insert(session).await.unwrap();

        assert_eq!(store.len().await, 1);
        let found = store.get(&id).await.unwrap().unwrap();
        assert_eq!(found.get("user"), Some(json!("alice")));
    }

    #[tokio::test]
    async fn get_or_create_returns_existing_for_known_id() {
        let store = InMemorySessionStore::new();
        let session = store.create();
        let id = session.id();
        session.set("user", json!("alice"));
        store.insert(session).await.unwrap();

        let (resolved, existed) = store.get_or_create(Some(id)).await.unwrap();
        assert!(existed);
        assert_eq!(resolved.id(), id);
        assert_eq!(resolved.get("user"), Some(json!("alice")));
    }

    #[tokio::test]
    async fn get_or_create_discards_unknown_presented_id() {
        let store = InMemorySessionStore::new();
        let stale = SessionId::new();

        let (session, existed) = store.get_or_create(Some(stale)).await.unwrap();
        assert!(!existed);
        assert_ne!(session.id(), stale);
        // The stale id was never indexed.
        assert!(store.get(&stale).await.unwrap().is_none());
        assert!(store.get(&session.id()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn get_or_create_without_presented_id_mints_fresh_session() {
        let store = InMemorySessionStore::new();
        let (session, existed) = store.get_or_create(None).await.unwrap();
        assert!(!existed);
        assert!(session.is_empty());
        assert!(store.get(&session.id()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn concurrent_get_or_create_with_same_id_yields_one_session() {
        let store = Arc::new(InMemorySessionStore::new());
        let seed = store.create();
        let id = seed.id();
        store.insert(seed).await.unwrap();

        let mut joins = Vec::new();
        for _ in 0..100 {
            let store = store.clone();
            joins.push(tokio::spawn(async move {
                store.get_or_create(Some(id)).await.unwrap()
            }));
        }
        for join in joins {
            let (session, existed) = join.await.unwrap();
            assert!(existed);
            assert_eq!(session.id(), id);
        }
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn expired_entry_is_absent_and_swept_on_get() {
        let store = InMemorySessionStore::with_ttl_secs(Some(0));
        let session = store.create();
        let id = session.id();
        store.insert(session).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert!(store.get(&id).await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn expired_presented_id_resolves_to_fresh_session() {
        let store = InMemorySessionStore::with_ttl_secs(Some(0));
        let session = store.create();
        let id = session.id();
        store.insert(session).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        let (fresh, existed) = store.get_or_create(Some(id)).await.unwrap();
        assert!(!existed);
        assert_ne!(fresh.id(), id);
    }

    #[tokio::test]
    async fn entries_without_ttl_never_expire() {
        let store = InMemorySessionStore::with_ttl_secs(None);
        let session = store.create();
        let id = session.id();
        store.insert(session).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert!(store.get(&id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn many_concurrent_operations_across_distinct_ids() {
        let store = Arc::new(InMemorySessionStore::new());
        let mut joins = Vec::new();

        for i in 0..100 {
            let store = store.clone();
            joins.push(tokio::spawn(async move {
                let session = store.create();
                let id = session.id();
                session.set("n", json!(i));
                store.insert(session).await.unwrap();

                let found = store.get(&id).await.unwrap().expect("just registered");
                assert_eq!(found.get("n"), Some(json!(i)));

                if i % 2 == 0 {
                    store.remove(&id).await.unwrap();
                    assert!(store.get(&id).await.unwrap().is_none());
                }
            }));
        }
        for join in joins {
            join.await.unwrap();
        }
        assert_eq!(store.len().await, 50);
    }
}
