//! Client-facing gateway for the tic-tac-toe session service.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **`WebSocket` endpoint** (`/` and `/ws`) speaking the JSON game
//!   protocol; every connection is registered with the session coordinator
//! - **Health endpoint** (`/health`)
//! - **Operator endpoints** (`/api/session`, `/api/session/sync`) to inspect
//!   local state and force a cross-instance resynchronisation
//!
//! # Architecture
//!
//! One task per connection reads client frames and hands them to the
//! [`SessionCoordinator`](tictac_core::SessionCoordinator). Outbound frames
//! arrive pre-serialized on the connection's queue, so a broadcast is
//! encoded once no matter how many clients are attached.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use error::GatewayError;
pub use router::build_router;
pub use server::ServerError;
pub use startup::{StartupError, spawn_gateway};
pub use state::AppState;
