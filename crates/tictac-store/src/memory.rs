//! In-memory snapshot store.
//!
//! Used for single-instance deployments and tests. Clones share the same
//! map, so two coordinators built on clones of one store see each other's
//! writes exactly like two instances sharing `Dragonfly`. An outage switch
//! makes every operation fail with [`StoreError::Unavailable`].

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tictac_types::{SessionId, SessionSnapshot};

use crate::SnapshotStore;
use crate::error::StoreError;

#[derive(Debug, Default)]
struct Inner {
    snapshots: Mutex<HashMap<String, SessionSnapshot>>,
    offline: AtomicBool,
    writes: AtomicU64,
}

/// Shared in-memory snapshot store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate losing (`false`) or regaining (`true`) the store.
    pub fn set_available(&self, available: bool) {
        self.inner.offline.store(!available, Ordering::SeqCst);
    }

    /// Peek at the stored snapshot, bypassing the outage switch.
    pub fn get(&self, session: &SessionId) -> Option<SessionSnapshot> {
        self.inner.snapshots.lock().get(&session.state_key()).cloned()
    }

    /// Number of successful saves so far.
    pub fn writes(&self) -> u64 {
        self.inner.writes.load(Ordering::SeqCst)
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(String::from(
                "memory store is offline",
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn load(&self, session: &SessionId) -> Result<Option<SessionSnapshot>, StoreError> {
        self.check_online()?;
        Ok(self.get(session))
    }

    async fn save(&self, session: &SessionId, snapshot: &SessionSnapshot) -> Result<(), StoreError> {
        self.check_online()?;
        self.inner
            .snapshots
            .lock()
            .insert(session.state_key(), snapshot.clone());
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tictac_types::Mark;

    use super::*;

    #[tokio::test]
    async fn clones_share_state() {
        let a = MemoryStore::new();
        let b = a.clone();
        let session = SessionId::default();
        let snapshot = SessionSnapshot {
            turn: Mark::O,
            revision: 4,
            ..SessionSnapshot::default()
        };

        a.save(&session, &snapshot).await.unwrap();
        assert_eq!(b.load(&session).await.unwrap(), Some(snapshot));
        assert_eq!(b.writes(), 1);
    }

    #[tokio::test]
    async fn last_write_wins() {
        let store = MemoryStore::new();
        let session = SessionId::default();
        let first = SessionSnapshot {
            revision: 1,
            ..SessionSnapshot::default()
        };
        let second = SessionSnapshot {
            revision: 1,
            turn: Mark::O,
            ..SessionSnapshot::default()
        };
        store.save(&session, &first).await.unwrap();
        store.save(&session, &second).await.unwrap();
        assert_eq!(store.load(&session).await.unwrap(), Some(second));
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let store = MemoryStore::new();
        store
            .save(&SessionId::new("a"), &SessionSnapshot::default())
            .await
            .unwrap();
        assert_eq!(store.load(&SessionId::new("b")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn outage_fails_every_operation() {
        let store = MemoryStore::new();
        let session = SessionId::default();
        store.set_available(false);
        assert!(matches!(
            store.load(&session).await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(store.save(&session, &SessionSnapshot::default()).await.is_err());
        assert_eq!(store.writes(), 0);

        store.set_available(true);
        assert!(store.load(&session).await.is_ok());
    }
}
