//! Adapters - Implementations of port interfaces.
//!
//! - `memory` - In-memory session store
//! - `http` - axum server shell and session middleware

pub mod http;
pub mod memory;

pub use http::{CurrentSession, Server, SessionLayerState};
pub use memory::InMemorySessionStore;
