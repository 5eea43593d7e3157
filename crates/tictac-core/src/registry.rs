//! Per-instance connection registry.
//!
//! Maps each live connection accepted by this instance to the participant
//! identity minted for it and to its outbound queue. The registry is owned
//! by the coordinator and never leaves the process.
//!
//! Outbound queues are bounded. A connection whose queue is full has stopped
//! reading and is reported dead, the same as one whose receiver is gone.

use std::collections::HashMap;
use std::sync::Arc;

use tictac_types::{ConnectionId, ParticipantId};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::warn;

/// Frames buffered per connection before it counts as stalled.
pub const OUTBOX_CAPACITY: usize = 64;

/// Outbound queue of a connection. Frames are pre-serialized JSON text.
pub type Outbox = mpsc::Sender<Arc<str>>;

/// Create a connection queue holding [`OUTBOX_CAPACITY`] frames.
pub fn outbox() -> (Outbox, mpsc::Receiver<Arc<str>>) {
    mpsc::channel(OUTBOX_CAPACITY)
}

#[derive(Debug)]
struct Entry {
    participant: ParticipantId,
    outbox: Outbox,
}

/// Live connections of this instance.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    entries: HashMap<ConnectionId, Entry>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `connection` and mint its participant identity.
    ///
    /// Registering a connection twice keeps the identity it already has and
    /// swaps in the new outbox.
    pub fn register(&mut self, connection: ConnectionId, outbox: Outbox) -> ParticipantId {
        if let Some(entry) = self.entries.get_mut(&connection) {
            entry.outbox = outbox;
            return entry.participant.clone();
        }
        let participant = ParticipantId::generate();
        self.entries.insert(
            connection,
            Entry {
                participant: participant.clone(),
                outbox,
            },
        );
        participant
    }

    /// Forget `connection`, returning the identity it held.
    pub fn unregister(&mut self, connection: ConnectionId) -> Option<ParticipantId> {
        self.entries.remove(&connection).map(|entry| entry.participant)
    }

    /// The identity of `connection`, if registered.
    pub fn lookup(&self, connection: ConnectionId) -> Option<&ParticipantId> {
        self.entries.get(&connection).map(|entry| &entry.participant)
    }

    /// Snapshot of every `(connection, identity)` pair at call time.
    pub fn all(&self) -> Vec<(ConnectionId, ParticipantId)> {
        self.entries
            .iter()
            .map(|(id, entry)| (*id, entry.participant.clone()))
            .collect()
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no connection is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Queue `frame` for `connection`.
    ///
    /// Returns `false` if the connection is unknown, its receiver is gone,
    /// or its queue is full.
    pub fn send_to(&self, connection: ConnectionId, frame: Arc<str>) -> bool {
        self.entries
            .get(&connection)
            .is_some_and(|entry| deliver(connection, &entry.outbox, frame))
    }

    /// Queue every frame for every connection, in order.
    ///
    /// Returns the connections that could not take a frame; they stay
    /// registered so the caller can run them through its disconnect
    /// handling.
    pub fn send_all(&self, frames: &[Arc<str>]) -> Vec<ConnectionId> {
        self.entries
            .iter()
            .filter(|(id, entry)| {
                !frames
                    .iter()
                    .all(|frame| deliver(**id, &entry.outbox, Arc::clone(frame)))
            })
            .map(|(id, _)| *id)
            .collect()
    }
}

fn deliver(connection: ConnectionId, outbox: &Outbox, frame: Arc<str>) -> bool {
    match outbox.try_send(frame) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            warn!(
                %connection,
                capacity = OUTBOX_CAPACITY,
                "outbound queue full; dropping connection"
            );
            false
        }
        Err(TrySendError::Closed(_)) => false,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn register_mints_distinct_identities() {
        let mut registry = ConnectionRegistry::new();
        let (tx, _rx) = outbox();
        let a = registry.register(ConnectionId::new(), tx.clone());
        let b = registry.register(ConnectionId::new(), tx);
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn identity_is_stable_for_a_connection() {
        let mut registry = ConnectionRegistry::new();
        let conn = ConnectionId::new();
        let (tx, _rx) = outbox();
        let first = registry.register(conn, tx.clone());
        let again = registry.register(conn, tx);
        assert_eq!(first, again);
        assert_eq!(registry.lookup(conn), Some(&first));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unregister_frees_the_identity() {
        let mut registry = ConnectionRegistry::new();
        let conn = ConnectionId::new();
        let (tx, _rx) = outbox();
        let participant = registry.register(conn, tx);

        assert_eq!(registry.unregister(conn), Some(participant));
        assert_eq!(registry.unregister(conn), None);
        assert!(registry.lookup(conn).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn all_is_a_snapshot() {
        let mut registry = ConnectionRegistry::new();
        let (tx, _rx) = outbox();
        let conn = ConnectionId::new();
        registry.register(conn, tx.clone());

        let listed = registry.all();
        registry.register(ConnectionId::new(), tx);
        assert_eq!(listed, vec![(conn, registry.lookup(conn).cloned().unwrap())]);
        assert_eq!(registry.all().len(), 2);
    }

    #[test]
    fn send_all_reports_closed_receivers() {
        let mut registry = ConnectionRegistry::new();
        let (live_tx, mut live_rx) = outbox();
        let (dead_tx, dead_rx) = outbox();
        let live = ConnectionId::new();
        let dead = ConnectionId::new();
        registry.register(live, live_tx);
        registry.register(dead, dead_tx);
        drop(dead_rx);

        let frames: Vec<Arc<str>> = vec![Arc::from("one"), Arc::from("two")];
        assert_eq!(registry.send_all(&frames), vec![dead]);
        assert_eq!(&*live_rx.try_recv().unwrap(), "one");
        assert_eq!(&*live_rx.try_recv().unwrap(), "two");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn full_queue_counts_as_dead() {
        let mut registry = ConnectionRegistry::new();
        let (stalled_tx, mut stalled_rx) = mpsc::channel(1);
        let stalled = ConnectionId::new();
        registry.register(stalled, stalled_tx);

        assert!(registry.send_to(stalled, Arc::from("first")));
        assert!(!registry.send_to(stalled, Arc::from("second")));
        assert_eq!(registry.send_all(&[Arc::from("third")]), vec![stalled]);
        assert_eq!(&*stalled_rx.try_recv().unwrap(), "first");
        assert!(stalled_rx.try_recv().is_err());
    }

    #[test]
    fn send_to_unknown_connection_fails() {
        let registry = ConnectionRegistry::new();
        assert!(!registry.send_to(ConnectionId::new(), Arc::from("x")));
    }
}
