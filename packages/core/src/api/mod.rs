//! HTTP API
//!
//! Exposes the remove-content handler over axum. Endpoint modules contribute
//! their own routes, merged in [`create_router`]:
//!
//! - `google_docs_endpoints`: health check and `removeContent`
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin dev-server
//! ```
//!
//! # Security
//!
//! The requesting user is taken from the `X-Remote-User` header as-is; put an
//! authenticating proxy in front of anything that is not a local setup.

use axum::Router;
use std::future::Future;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::services::RemovalRequestHandler;

mod google_docs_endpoints;
mod http_error;

pub use google_docs_endpoints::{HealthStatus, REMOTE_USER_HEADER};
pub use http_error::HttpError;

/// Application state shared across all endpoints
#[derive(Clone)]
pub struct AppState {
    pub handler: Arc<RemovalRequestHandler>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(handler: RemovalRequestHandler, config: ServerConfig) -> Self {
        Self {
            handler: Arc::new(handler),
            config: Arc::new(config),
        }
    }
}

/// Create the main application router with all endpoint modules
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(google_docs_endpoints::routes(state))
        .layer(TraceLayer::new_for_http())
}

/// Serve the API until `shutdown` resolves
///
/// In-flight requests finish before this returns; rollback compensations they
/// started are then awaited so no node is left half-released.
///
/// # Errors
///
/// Returns error if the server fails to bind or serve.
pub async fn start_server<S>(state: AppState, shutdown: S) -> anyhow::Result<()>
where
    S: Future<Output = ()> + Send + 'static,
{
    let addr = state.config.listen_addr();
    let coordinator = state.handler.coordinator().clone();
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("🚀 HTTP server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    let pending = coordinator.pending_compensations();
    if pending > 0 {
        tracing::info!("Waiting for {} rollback compensation(s)", pending);
    }
    coordinator.wait_for_compensations().await;
    tracing::info!("Server stopped");

    Ok(())
}
