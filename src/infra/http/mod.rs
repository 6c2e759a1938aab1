//! HTTP ingest for CMS publish events.

mod error;
mod handlers;
mod middleware;

pub use error::ApiError;
pub use handlers::{BanRequest, PublishRequest};

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tracing::{info, warn};

use crate::ban::BanDispatcher;

use super::error::InfraError;

#[derive(Clone)]
pub struct HttpState {
    pub dispatcher: Arc<BanDispatcher>,
    /// Base URL used when a publish request does not carry one.
    pub default_base_url: Option<String>,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/events", post(handlers::publish_events))
        .route("/bans", post(handlers::ban_url))
        .with_state(state)
        .layer(axum_middleware::from_fn(middleware::log_responses))
}

/// Serve until Ctrl-C, then wait at most `graceful_shutdown` for in-flight
/// requests to finish.
pub async fn serve(
    addr: SocketAddr,
    state: HttpState,
    graceful_shutdown: Duration,
) -> Result<(), InfraError> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Listening for publish events");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, build_router(state).into_make_service())
        .with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => return result.map_err(InfraError::from),
        _ = tokio::signal::ctrl_c() => info!("Shutdown signal received"),
    }

    let _ = shutdown_tx.send(());
    match tokio::time::timeout(graceful_shutdown, server).await {
        Ok(result) => result.map_err(InfraError::from),
        Err(_) => {
            warn!(
                timeout_secs = graceful_shutdown.as_secs(),
                "Graceful shutdown timed out"
            );
            Ok(())
        }
    }
}
