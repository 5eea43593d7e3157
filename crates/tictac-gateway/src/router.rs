//! Axum router construction for the gateway.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router.
///
/// The router includes:
/// - `GET /` and `GET /ws` -- `WebSocket` game connection
/// - `GET /health` -- liveness
/// - `GET /api/session` -- local session snapshot
/// - `POST /api/session/sync` -- republish local state as `full-sync`
///
/// CORS allows any origin so browser clients can be served from anywhere.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // WebSocket
        .route("/", get(ws::ws_session))
        .route("/ws", get(ws::ws_session))
        // REST API
        .route("/health", get(handlers::health))
        .route("/api/session", get(handlers::get_session))
        .route("/api/session/sync", post(handlers::post_sync))
        .fallback(handlers::not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
