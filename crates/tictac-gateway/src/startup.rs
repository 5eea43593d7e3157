//! Gateway startup helper for the node binary.
//!
//! [`spawn_gateway`] binds eagerly, so an unusable address is reported to
//! the caller, then serves on a background Tokio task.

use std::net::SocketAddr;
use std::sync::Arc;

use tictac_core::config::ServerConfig;
use tokio::task::JoinHandle;

use crate::server::{self, ServerError};
use crate::state::AppState;

/// Errors that can occur when spawning the gateway.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The server failed to bind or start.
    #[error("server start error: {0}")]
    Server(#[from] ServerError),
}

/// Bind the gateway and serve it on a background task.
///
/// Returns the bound address (useful with port `0`) and the task handle;
/// the task ends only if serving fails.
///
/// # Errors
///
/// Returns [`StartupError::Server`] if the listener cannot be bound.
pub async fn spawn_gateway(
    config: &ServerConfig,
    state: Arc<AppState>,
) -> Result<(SocketAddr, JoinHandle<()>), StartupError> {
    let listener = server::bind(config).await?;
    let addr = listener
        .local_addr()
        .map_err(|e| ServerError::Bind(format!("no local address: {e}")))?;

    let handle = tokio::spawn(async move {
        if let Err(e) = server::serve(listener, state).await {
            tracing::error!(error = %e, "Gateway server exited with error");
        }
    });

    tracing::info!(%addr, "Gateway spawned on background task");
    Ok((addr, handle))
}
