//! Servette - Minimal Web-Serving Toolkit
//!
//! A thin server shell over axum plus the part with actual engineering
//! content: a concurrency-safe, pluggable session subsystem. Sessions are
//! opaque-id key/value bags owned by a store; the HTTP middleware binds them
//! to inbound requests via a cookie, creating a session (and issuing the
//! cookie) when none resolves.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
