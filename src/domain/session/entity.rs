//! Session entity - per-visitor key/value state.
//!
//! A `Session` is a cheaply cloneable handle (`Arc` inner) to a bag of
//! key/value state identified by an opaque [`SessionId`]. The id is immutable
//! for the life of the session; the data bag is guarded by its own
//! reader/writer lock, independent of any store-level lock, so mutating one
//! session never contends with another.
//!
//! # Invariants
//!
//! - `id` is globally unique and never changes after creation
//! - a single key is never observed in a partially written state
//! - concurrent `set` calls on the same key are last-write-wins

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::domain::foundation::{SessionId, Timestamp};

/// Handle to one visitor's session state.
///
/// Cloning produces another handle to the same underlying state; all clones
/// observe each other's writes.
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    id: SessionId,
    created_at: Timestamp,
    data: RwLock<HashMap<String, Value>>,
}

impl Session {
    /// Creates an empty session with a freshly minted id.
    pub fn new() -> Self {
        Self::with_id(SessionId::new())
    }

    /// Creates an empty session with the given id.
    pub fn with_id(id: SessionId) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                id,
                created_at: Timestamp::now(),
                data: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Returns the immutable session id.
    pub fn id(&self) -> SessionId {
        self.inner.id
    }

    /// Returns when the session was created.
    pub fn created_at(&self) -> Timestamp {
        self.inner.created_at
    }

    /// Retrieves the value stored under `key`.
    ///
    /// An absent key is a normal `None`, not an error.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner
            .data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Retrieves the value stored under `key`, deserialized into `T`.
    ///
    /// Returns `None` when the key is absent or the stored value does not
    /// deserialize into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|v| serde_json::from_value(v).ok())
    }

    /// Stores `value` under `key`, overwriting any previous value.
    ///
    /// Concurrent writes to the same key are last-write-wins; no ordering is
    /// guaranteed beyond the data lock itself.
    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.inner
            .data
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value);
    }

    /// Returns whether `key` is present.
    pub fn exists(&self, key: &str) -> bool {
        self.inner
            .data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    /// Removes `key`, returning the value that was stored under it.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.inner
            .data
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
    }

    /// Returns the number of stored keys.
    pub fn len(&self) -> usize {
        self.inner
            .data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns whether the session holds no data.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns whether two handles refer to the same underlying session.
    pub fn same_instance(a: &Session, b: &Session) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Session {
    /// Sessions are identified by id; two handles are equal when they name
    /// the same session.
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Session {}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn set_then_get_returns_value() {
        let session = Session::new();
        session.set("user", json!("alice"));
        assert_eq!(session.get("user"), Some(json!("alice")));
        assert!(session.exists("user"));
    }

    #[test]
    fn absent_key_is_none_not_error() {
        let session = Session::new();
        assert_eq!(session.get("missing"), None);
        assert!(!session.exists("missing"));
    }

    #[test]
    fn set_overwrites_previous_value() {
        let session = Session::new();
        session.set("count", json!(1));
        session.set("count", json!(2));
        assert_eq!(session.get("count"), Some(json!(2)));
        assert_eq!(session.len(), 1);
    }

    #[test]
    fn remove_clears_key() {
        let session = Session::new();
        session.set("user", json!("alice"));
        assert_eq!(session.remove("user"), Some(json!("alice")));
        assert_eq!(session.get("user"), None);
        assert_eq!(session.remove("user"), None);
    }

    #[test]
    fn get_as_deserializes_stored_value() {
        let session = Session::new();
        session.set("count", json!(42));
        assert_eq!(session.get_as::<u32>("count"), Some(42));
        assert_eq!(session.get_as::<String>("count"), None);
    }

    #[test]
    fn clones_share_state() {
        let session = Session::new();
        let other = session.clone();
        session.set("user", json!("alice"));
        assert_eq!(other.get("user"), Some(json!("alice")));
        assert!(Session::same_instance(&session, &other));
    }

    #[test]
    fn concurrent_writers_do_not_corrupt_the_bag() {
        let session = Session::new();
        let mut handles = Vec::new();
        for i in 0..100 {
            let session = session.clone();
            handles.push(std::thread::spawn(move || {
                session.set(format!("key-{i}"), json!(i));
                assert_eq!(session.get(&format!("key-{i}")), Some(json!(i)));
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(session.len(), 100);
    }

    proptest! {
        #[test]
        fn set_get_round_trips(key in ".{1,64}", value in any::<i64>()) {
            let session = Session::new();
            session.set(key.clone(), json!(value));
            prop_assert_eq!(session.get(&key), Some(json!(value)));
            prop_assert!(session.exists(&key));
        }

        #[test]
        fn never_set_keys_are_absent(key in ".{1,64}") {
            let session = Session::new();
            prop_assert_eq!(session.get(&key), None);
            prop_assert!(!session.exists(&key));
        }
    }
}
