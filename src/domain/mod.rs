//! Domain layer containing the session model and shared primitives.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (ids, timestamps)
//! - `session` - The session entity and store error type

pub mod foundation;
pub mod session;
