//! Session resolution middleware and extractor for axum.
//!
//! This module provides:
//! - `session_middleware` - Layer that binds every request to a session
//! - `CurrentSession` - Extractor handing the bound session to handlers
//!
//! # Protocol
//!
//! The middleware reads the configured cookie from the inbound request and
//! resolves it against the [`SessionStore`]:
//!
//! ```text
//! cookie absent / malformed / unknown id → create session, issue Set-Cookie
//! cookie names a live session           → reuse it, no cookie rewritten
//! ```
//!
//! Both branches always yield a usable session; the terminal state of every
//! request is "bound". Lookup and create happen in one atomic store call, so
//! concurrent requests presenting the same known id share one session.
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, routing::get, middleware};
//!
//! let state = SessionLayerState::new(store, &config.session);
//! let app = Router::new()
//!     .route("/", get(handler))
//!     .layer(middleware::from_fn_with_state(state, session_middleware));
//!
//! async fn handler(CurrentSession { session, .. }: CurrentSession) -> String {
//!     session.set("hits", serde_json::json!(1));
//!     format!("session {}", session.id())
//! }
//! ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::config::SessionConfig;
use crate::domain::foundation::SessionId;
use crate::domain::session::Session;
use crate::ports::SessionStore;

/// Session middleware state - the store plus cookie parameters.
#[derive(Clone)]
pub struct SessionLayerState {
    store: Arc<dyn SessionStore>,
    cookie_name: String,
    cookie_max_age_secs: u64,
}

impl SessionLayerState {
    /// Creates middleware state from a store and session configuration.
    pub fn new(store: Arc<dyn SessionStore>, config: &SessionConfig) -> Self {
        Self {
            store,
            cookie_name: config.cookie_name.clone(),
            cookie_max_age_secs: config.cookie_max_age_secs,
        }
    }

    /// Returns the configured cookie name.
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }
}

/// The session bound to the current request.
///
/// `existed` means the session was registered before this request arrived -
/// it says nothing about success (both branches always carry a usable
/// session) and nothing about why a presented cookie did not resolve.
#[derive(Debug, Clone)]
pub struct CurrentSession {
    /// The resolved session.
    pub session: Session,
    /// Whether the session existed prior to this request.
    pub existed: bool,
}

/// Session resolution middleware.
///
/// This middleware:
/// 1. Reads the configured cookie from the request; a missing or malformed
///    value is treated as "no session"
/// 2. Resolves it via the store's atomic `get_or_create`
/// 3. Injects [`CurrentSession`] into request extensions
/// 4. When a session was created, appends a `Set-Cookie` header carrying the
///    new id with `HttpOnly` and the configured max-age
///
/// A store failure returns 503; the in-memory store never takes that branch.
pub async fn session_middleware(
    State(state): State<SessionLayerState>,
    mut request: Request,
    next: Next,
) -> Response {
    let presented = cookie_value(request.headers(), &state.cookie_name)
        .and_then(|value| value.parse::<SessionId>().ok());

    let (session, existed) = match state.store.get_or_create(presented).await {
        Ok(resolved) => resolved,
        Err(e) => {
            tracing::error!("Session store unavailable: {}", e);
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "error": "Session store unavailable",
                    "code": "SESSION_STORE_ERROR"
                })),
            )
                .into_response();
        }
    };

    let session_id = session.id();
    request.extensions_mut().insert(CurrentSession { session, existed });

    let mut response = next.run(request).await;

    if !existed {
        tracing::debug!(session_id = %session_id, "issuing session cookie");
        let cookie = format_set_cookie(
            &state.cookie_name,
            &session_id.to_string(),
            state.cookie_max_age_secs,
        );
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(_) => {
                // Cookie name is validated at config load; ids are uuids.
                tracing::error!(cookie_name = %state.cookie_name, "invalid session cookie");
            }
        }
    }

    response
}

/// Extracts the value of the cookie named `name` from the request headers.
///
/// Handles multiple `Cookie` headers and multiple `name=value` pairs per
/// header. Returns `None` when the cookie is absent or the header is not
/// valid UTF-8.
fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| {
            let (k, v) = pair.split_once('=')?;
            (k.trim() == name).then(|| v.trim().to_string())
        })
        .next()
}

/// Formats a `Set-Cookie` header value for the session cookie.
///
/// The cookie is `HttpOnly` so script cannot read the bearer id, scoped to
/// `/`, and expires after `max_age_secs`.
fn format_set_cookie(name: &str, value: &str, max_age_secs: u64) -> String {
    format!("{name}={value}; Max-Age={max_age_secs}; Path=/; HttpOnly")
}

impl<S> axum::extract::FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = SessionRejection;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut axum::http::request::Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            parts
                .extensions
                .get::<CurrentSession>()
                .cloned()
                .ok_or(SessionRejection::MiddlewareNotInstalled)
        })
    }
}

/// Rejection type for session extraction failures.
#[derive(Debug, Clone)]
pub enum SessionRejection {
    /// The session middleware is not installed on this route.
    MiddlewareNotInstalled,
}

impl IntoResponse for SessionRejection {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            SessionRejection::MiddlewareNotInstalled => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Session middleware not installed",
            ),
        };

        (
            status,
            Json(serde_json::json!({
                "error": message,
                "code": "SESSION_NOT_RESOLVED"
            })),
        )
            .into_response()
    }
}
