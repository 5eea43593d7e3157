//! `Dragonfly` (Redis-compatible) snapshot store.
//!
//! # Key Patterns
//!
//! | Pattern | Type | Description |
//! |---------|------|-------------|
//! | `game_state:{session}` | JSON | Full session snapshot |
//!
//! Writes are plain `SET`s: the key is a last-writer-wins register shared
//! by every instance.

use async_trait::async_trait;
use fred::prelude::*;
use tictac_types::{SessionId, SessionSnapshot};

use crate::SnapshotStore;
use crate::error::StoreError;

/// Connection handle to a `Dragonfly` (Redis-compatible) instance.
#[derive(Clone)]
pub struct DragonflyStore {
    client: Client,
}

impl DragonflyStore {
    /// Connect to `Dragonfly` at the given URL.
    ///
    /// The URL should follow the Redis URL scheme:
    /// `redis://host:port` or `redis://host:port/db`
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if the URL cannot be parsed.
    /// Returns [`StoreError::Dragonfly`] if the connection fails.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let config = Config::from_url(url)
            .map_err(|e| StoreError::Config(format!("Invalid Dragonfly URL: {e}")))?;

        let client = Builder::from_config(config).build()?;
        client.init().await?;

        tracing::info!("Connected to Dragonfly");
        Ok(Self { client })
    }
}

#[async_trait]
impl SnapshotStore for DragonflyStore {
    async fn load(&self, session: &SessionId) -> Result<Option<SessionSnapshot>, StoreError> {
        let value: Option<String> = self.client.get(session.state_key()).await?;
        match value {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, session: &SessionId, snapshot: &SessionSnapshot) -> Result<(), StoreError> {
        let json = serde_json::to_string(snapshot)?;
        let key = session.state_key();
        let _: () = self
            .client
            .set(key.as_str(), json.as_str(), None, None, false)
            .await?;
        tracing::debug!(key, revision = snapshot.revision, "Stored session snapshot");
        Ok(())
    }
}

impl std::fmt::Debug for DragonflyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DragonflyStore").finish_non_exhaustive()
    }
}
