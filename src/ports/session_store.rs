//! Session store port.
//!
//! Defines the contract for the registry owning all [`Session`] instances.
//! The in-memory adapter is the reference implementation; the trait is the
//! seam where a persistent backend would plug in.
//!
//! # Design
//!
//! - **Absence is structural**: a missing session is `Ok(None)`, never an
//!   error. `SessionStoreError` covers backend failure only.
//! - **Concrete session type**: the store trades in the one `Session` type
//!   this crate owns end-to-end, so there is no foreign-implementation
//!   hazard to validate against.
//! - **Two-step create**: `create` mints a session without registering it,
//!   letting the caller initialize data before publishing via `insert`.

use crate::domain::foundation::SessionId;
use crate::domain::session::{Session, SessionStoreError};
use async_trait::async_trait;

/// Registry port owning all sessions for a server instance.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Look up a session by id.
    ///
    /// Returns `Ok(None)` when the id is unknown or the entry has expired.
    async fn get(&self, id: &SessionId) -> Result<Option<Session>, SessionStoreError>;

    /// Register a session, keyed by its own id, replacing any existing entry.
    async fn insert(&self, session: Session) -> Result<(), SessionStoreError>;

    /// Remove the entry for `id`. A no-op (not an error) when absent.
    async fn remove(&self, id: &SessionId) -> Result<(), SessionStoreError>;

    /// Mint a fresh, empty session **without** registering it.
    ///
    /// The caller publishes the session via [`insert`](Self::insert) once its
    /// initial data is in place. Until then the session is invisible to
    /// concurrent readers.
    fn create(&self) -> Session;

    /// Atomic lookup-or-create.
    ///
    /// When `presented` names a live entry, returns `(existing, true)`.
    /// Otherwise mints a fresh session, registers it, and returns
    /// `(new, false)`; a presented id unknown to the store is discarded, never
    /// indexed. The lookup and create happen under a single critical section,
    /// so two concurrent calls with the same known id always observe the same
    /// session.
    ///
    /// The boolean means "the session existed prior to this call" - both
    /// branches return a usable session, so it is not a success flag.
    async fn get_or_create(
        &self,
        presented: Option<SessionId>,
    ) -> Result<(Session, bool), SessionStoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Trait object safety test
    #[test]
    fn session_store_is_object_safe() {
        fn _accepts_dyn(_store: &dyn SessionStore) {}
    }
}
