//! Snapshot store for the tic-tac-toe session service.
//!
//! The store is the durable source of truth for a session: every instance
//! writes the full [`SessionSnapshot`] after each mutation and reloads it
//! when it needs the freshest shared view. Writes are last-writer-wins;
//! there is no compare-and-set.
//!
//! # Modules
//!
//! - [`dragonfly`] -- `Dragonfly` (Redis-compatible) backend
//! - [`memory`] -- In-process backend for single-instance runs and tests
//! - [`error`] -- Shared error types

pub mod dragonfly;
pub mod error;
pub mod memory;

// Re-export primary types for convenience.
pub use dragonfly::DragonflyStore;
pub use error::StoreError;
pub use memory::MemoryStore;

use async_trait::async_trait;
use tictac_types::{SessionId, SessionSnapshot};

/// Key/value persistence of session snapshots, keyed by session id.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Load the stored snapshot, or `None` if the session was never saved.
    async fn load(&self, session: &SessionId) -> Result<Option<SessionSnapshot>, StoreError>;

    /// Overwrite the stored snapshot.
    async fn save(&self, session: &SessionId, snapshot: &SessionSnapshot) -> Result<(), StoreError>;
}
