//! Session domain - the per-visitor state bag and its error type.

mod entity;
mod errors;

pub use entity::Session;
pub use errors::SessionStoreError;
