//! Shared type definitions for the tic-tac-toe session service.
//!
//! This crate is the single source of truth for data that crosses a
//! boundary: the client wire protocol, the snapshot persisted in the store,
//! and the sync events exchanged between instances. Wire-facing types
//! derive `ts-rs` so a browser client can be generated from them.
//!
//! # Modules
//!
//! - [`ids`] -- Connection, instance, participant and session identifiers
//! - [`enums`] -- Marks, cells, phases and outcomes
//! - [`snapshot`] -- Board and full session snapshot
//! - [`wire`] -- Client and server messages
//! - [`sync`] -- Cross-instance sync events and channels

pub mod enums;
pub mod ids;
pub mod snapshot;
pub mod sync;
pub mod wire;

// Re-export all public types at crate root for convenience.
pub use enums::{Cell, Mark, Outcome, Phase};
pub use ids::{ConnectionId, InstanceId, ParticipantId, SessionId};
pub use snapshot::{BOARD_SIZE, Board, Seat, SessionSnapshot};
pub use sync::{Channel, SyncEvent, SyncPayload};
pub use wire::{ClientMessage, ProtocolError, ServerMessage, StateUpdate};
