//! REST endpoint handlers for health checks and operator control.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health` | Liveness plus instance and session ids |
//! | `GET` | `/api/session` | Local session snapshot and connection count |
//! | `POST` | `/api/session/sync` | Persist and republish local state as `full-sync` |
//!
//! The sync endpoint answers `503 Service Unavailable` when the store or the
//! bus refused the snapshot; the body says which.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::{StatusCode, Uri};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tictac_types::{SessionSnapshot, StateUpdate};

use crate::error::GatewayError;
use crate::state::AppState;

/// Response body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct Health {
    /// Always `"ok"`.
    pub status: &'static str,
    /// This instance's bus identity.
    pub instance: String,
    /// The session served.
    pub session: String,
    /// When the gateway started.
    pub started_at: DateTime<Utc>,
}

/// Response body of `GET /api/session`.
#[derive(Debug, Serialize)]
pub struct SessionView {
    /// This instance's bus identity.
    pub instance: String,
    /// The session served.
    pub session: String,
    /// Live local connections.
    pub connections: usize,
    /// Full local snapshot, as persisted.
    pub snapshot: SessionSnapshot,
    /// The same state as clients see it.
    pub state: StateUpdate,
}

/// Response body of `POST /api/session/sync`.
#[derive(Debug, Serialize)]
pub struct SyncAck {
    /// Whether the store accepted the snapshot.
    pub persisted: bool,
    /// Whether the bus accepted the `full-sync` event.
    pub published: bool,
    /// Revision that was published.
    pub revision: u64,
}

/// `GET /health`
pub async fn health(State(state): State<Arc<AppState>>) -> Json<Health> {
    Json(Health {
        status: "ok",
        instance: state.coordinator.instance().to_string(),
        session: state.coordinator.session_id().to_string(),
        started_at: state.started_at,
    })
}

/// `GET /api/session`
pub async fn get_session(State(state): State<Arc<AppState>>) -> Json<SessionView> {
    let coordinator = &state.coordinator;
    let snapshot = coordinator.snapshot().await;
    Json(SessionView {
        instance: coordinator.instance().to_string(),
        session: coordinator.session_id().to_string(),
        connections: coordinator.connection_count().await,
        state: StateUpdate::from(&snapshot),
        snapshot,
    })
}

/// `POST /api/session/sync`
pub async fn post_sync(State(state): State<Arc<AppState>>) -> (StatusCode, Json<SyncAck>) {
    let (snapshot, committed) = state.coordinator.publish_full_sync().await;
    let status = if committed.is_complete() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(SyncAck {
            persisted: committed.persisted,
            published: committed.published,
            revision: snapshot.revision,
        }),
    )
}

/// Fallback for unknown routes.
pub async fn not_found(uri: Uri) -> GatewayError {
    GatewayError::NotFound(format!("no route for {uri}"))
}
