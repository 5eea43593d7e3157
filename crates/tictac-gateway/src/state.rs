//! Shared application state for the gateway.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tictac_core::SessionCoordinator;

/// State shared by every route and `WebSocket` task.
#[derive(Debug)]
pub struct AppState {
    /// The session this instance serves.
    pub coordinator: Arc<SessionCoordinator>,
    /// Interval between server pings on each `WebSocket`.
    pub keepalive: Duration,
    /// When this gateway was built.
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Wrap `coordinator`, pinging clients every `keepalive_secs` seconds
    /// (at least one).
    pub fn new(coordinator: Arc<SessionCoordinator>, keepalive_secs: u64) -> Self {
        Self {
            coordinator,
            keepalive: Duration::from_secs(keepalive_secs.max(1)),
            started_at: Utc::now(),
        }
    }
}
