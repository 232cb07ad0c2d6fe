//! HTTP middleware.

mod session;

pub use session::{session_middleware, CurrentSession, SessionLayerState, SessionRejection};
