//! Session store error type.

use thiserror::Error;

/// Errors a session store backend may surface.
///
/// Absence of a session is never an error - stores report it structurally as
/// `Option::None`. The in-memory store is infallible; this type exists for
/// the pluggable seam, where a persistent backend can genuinely fail.
#[derive(Debug, Clone, Error)]
pub enum SessionStoreError {
    /// The backing storage failed (connection lost, serialization, etc.).
    #[error("Session backend unavailable: {0}")]
    BackendUnavailable(String),
}

impl SessionStoreError {
    /// Creates a backend unavailable error with a message.
    pub fn backend_unavailable(message: impl Into<String>) -> Self {
        Self::BackendUnavailable(message.into())
    }
}
