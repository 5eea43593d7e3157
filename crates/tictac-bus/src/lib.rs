//! Synchronization bus for the tic-tac-toe session service.
//!
//! Instances announce every committed session mutation as a
//! [`SyncEvent`] and consume everyone else's. Delivery is at-least-once and
//! ordered per publisher; consumers drop their own echoes by comparing the
//! event's origin instance.
//!
//! # Modules
//!
//! - [`nats`] -- NATS transport, one subject per [`Channel`](tictac_types::Channel)
//! - [`memory`] -- In-process broadcast transport for single-instance runs and tests
//! - [`error`] -- Shared error types

pub mod error;
pub mod memory;
pub mod nats;

pub use error::BusError;
pub use memory::MemoryBus;
pub use nats::NatsBus;

use async_trait::async_trait;
use futures::stream::BoxStream;
use tictac_types::SyncEvent;

/// Channel prefix used when none is configured.
pub const DEFAULT_PREFIX: &str = "tic_tac_toe";

/// Stream of decoded events from every channel of the bus.
pub type SyncStream = BoxStream<'static, SyncEvent>;

/// Publish/subscribe transport for [`SyncEvent`]s.
#[async_trait]
pub trait SyncBus: Send + Sync {
    /// Publish `event` on the channel matching its kind.
    async fn publish(&self, event: &SyncEvent) -> Result<(), BusError>;

    /// Subscribe to every channel. Undecodable messages are skipped.
    async fn subscribe(&self) -> Result<SyncStream, BusError>;
}
