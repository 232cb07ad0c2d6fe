//! Shared domain primitives (value objects and identifiers).

mod ids;
mod timestamp;

pub use ids::SessionId;
pub use timestamp::Timestamp;
