//! HTTP surface of the issue service.
//!
//! Routes (both prefixes are served):
//!
//! - `GET    /api/issues/{project}` - list, filtered by query parameters
//! - `POST   /api/issues/{project}` - create
//! - `PUT    /api/issues/{project}` - partial update by `_id`
//! - `DELETE /api/issues/{project}` - delete by `_id`
//! - `GET    /health`

pub mod payload;
pub mod routes;

use std::net::SocketAddr;

use axum::Router;
use axum::routing::get;
use issues_lib::IssueService;
use tokio::net::TcpListener;
use tracing::info;

use crate::error::{Result, TrackerError};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub service: IssueService,
}

impl AppState {
    #[must_use]
    pub const fn new(service: IssueService) -> Self {
        Self { service }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let issues = get(routes::list_issues)
        .post(routes::create_issue)
        .put(routes::update_issue)
        .delete(routes::delete_issue);

    Router::new()
        .route("/health", get(routes::health))
        .route("/api/issues/:project", issues.clone())
        .route("/issues/:project", issues)
        .with_state(state)
}

/// Bind `addr` and serve until ctrl-c or SIGTERM.
///
/// # Errors
///
/// Returns `Bind` if the address is unavailable, or `Io` if the server fails.
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| TrackerError::Bind { addr, source })?;
    serve_on(listener, state).await
}

/// Serve on an already bound listener.
///
/// # Errors
///
/// Returns `Io` if the server fails.
pub async fn serve_on(listener: TcpListener, state: AppState) -> Result<()> {
    let local = listener.local_addr()?;
    info!(
        addr = %local,
        store = state.service.store().backend(),
        "issue tracker listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received");
}
