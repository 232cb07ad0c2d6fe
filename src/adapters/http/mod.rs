//! HTTP adapters - the server shell and session middleware.

pub mod middleware;
mod server;

pub use middleware::{session_middleware, CurrentSession, SessionLayerState, SessionRejection};
pub use server::{init_tracing, Server, ServerError, ShutdownHandle};
