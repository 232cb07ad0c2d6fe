//! Thin HTTP server shell over axum.
//!
//! Route registration, lifecycle, and request logging are all delegation to
//! axum and tower-http; the one piece of behavior this shell adds is wiring
//! the session middleware in from an explicitly injected store. There is no
//! process-wide server instance - construct a [`Server`] at startup and keep
//! the handle.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::MethodRouter;
use axum::{middleware, Router};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::{ServerConfig, SessionConfig, ValidationError};
use crate::ports::SessionStore;

use super::middleware::{session_middleware, SessionLayerState};

/// Errors that can occur while running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Invalid bind address: {0}")]
    InvalidAddress(#[from] ValidationError),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("Server terminated abnormally: {0}")]
    Serve(#[from] std::io::Error),
}

/// HTTP server with routing and session management.
pub struct Server {
    config: ServerConfig,
    router: Router,
    shutdown: Arc<Notify>,
}

/// Handle that stops a running [`Server`].
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    shutdown: Arc<Notify>,
}

impl ShutdownHandle {
    /// Signals the server to stop accepting connections and drain.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }
}

impl Server {
    /// Creates a server with an empty router.
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            router: Router::new(),
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Registers a handler for the given path.
    pub fn route(mut self, path: &str, handler: MethodRouter) -> Self {
        tracing::info!(path, "registered route");
        self.router = self.router.route(path, handler);
        self
    }

    /// Merges an externally built router.
    pub fn merge(mut self, other: Router) -> Self {
        self.router = self.router.merge(other);
        self
    }

    /// Installs the session middleware backed by `store`.
    ///
    /// Every request on every registered route is then bound to a session;
    /// handlers receive it through the `CurrentSession` extractor.
    pub fn with_sessions(mut self, store: Arc<dyn SessionStore>, config: &SessionConfig) -> Self {
        let state = SessionLayerState::new(store, config);
        self.router = self
            .router
            .layer(middleware::from_fn_with_state(state, session_middleware));
        self
    }

    /// Returns a handle that can stop the running server.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            shutdown: self.shutdown.clone(),
        }
    }

    /// Returns the assembled router without serving it.
    ///
    /// Useful for driving the whole stack in tests via `tower::ServiceExt`.
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Binds the configured address and serves until shutdown is signalled.
    pub async fn start(self) -> Result<(), ServerError> {
        let addr = self.config.socket_addr()?;
        let listener = TcpListener::bind(addr).await.map_err(|source| ServerError::Bind {
            addr: addr.to_string(),
            source,
        })?;

        let app = self.router.layer((
            TraceLayer::new_for_http(),
            TimeoutLayer::new(Duration::from_secs(self.config.request_timeout_secs)),
        ));

        let shutdown = self.shutdown.clone();
        tracing::info!(%addr, "server started");
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.notified().await })
            .await?;
        tracing::info!(%addr, "server stopped");
        Ok(())
    }
}

/// Initializes the global tracing subscriber from the configured filter.
///
/// Falls back to `RUST_LOG` when set. Safe to call once per process.
pub fn init_tracing(config: &ServerConfig) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemorySessionStore;
    use axum::routing::get;

    #[test]
    fn server_assembles_routes_and_sessions() {
        let store: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
        let server = Server::new(ServerConfig::default())
            .route("/", get(|| async { "ok" }))
            .with_sessions(store, &SessionConfig::default());

        // Router assembly is infallible; serving it is covered by the
        // integration tests.
        let _router = server.into_router();
    }

    #[tokio::test]
    async fn shutdown_handle_stops_running_server() {
        // Port 0 binds an ephemeral port; the config validator would reject
        // it, but start() only needs an address the OS can bind.
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            ..Default::default()
        };
        let server = Server::new(config).route("/", get(|| async { "ok" }));
        let handle = server.shutdown_handle();

        let running = tokio::spawn(server.start());
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.shutdown();

        let result = tokio::time::timeout(Duration::from_secs(2), running)
            .await
            .expect("server should stop after shutdown")
            .expect("server task should not panic");
        assert!(result.is_ok());
    }
}
