//! Session coordinator.
//!
//! The coordinator is the single serialization point for one session on one
//! instance. It owns the in-memory [`SessionState`] and the
//! [`ConnectionRegistry`], and drives every mutation through the same
//! sequence while holding its lock:
//!
//! 1. apply the command to local state
//! 2. persist the resulting snapshot to the store
//! 3. publish a sync event for the other instances
//! 4. reply to the requester and fan the new state out to local connections
//!
//! Incoming sync events from other instances go through the same lock and
//! are reconciled against the store.
//! Store and bus failures are logged and swallowed: the instance keeps
//! serving from its local (possibly stale) state.

use std::sync::Arc;

use futures::StreamExt;
use tictac_bus::{BusError, SyncBus, SyncStream};
use tictac_session::{SessionState, validate};
use tictac_store::SnapshotStore;
use tictac_types::{
    ClientMessage, ConnectionId, InstanceId, ParticipantId, Phase, ServerMessage, SessionId,
    SessionSnapshot, SyncEvent, SyncPayload,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::registry::{ConnectionRegistry, Outbox};

/// How far a committed snapshot got on the shared backplane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Committed {
    /// The snapshot was written to the store.
    pub persisted: bool,
    /// The sync event was handed to the bus.
    pub published: bool,
}

impl Committed {
    /// Whether both the store and the bus took the commit.
    pub const fn is_complete(self) -> bool {
        self.persisted && self.published
    }
}

/// State guarded by the coordinator lock.
#[derive(Debug, Default)]
struct Inner {
    session: SessionState,
    registry: ConnectionRegistry,
}

/// Orchestrates one session on this instance.
pub struct SessionCoordinator {
    instance: InstanceId,
    session_id: SessionId,
    store: Arc<dyn SnapshotStore>,
    bus: Arc<dyn SyncBus>,
    inner: Mutex<Inner>,
}

impl SessionCoordinator {
    /// Create a coordinator with an empty session.
    pub fn new(
        instance: InstanceId,
        session_id: SessionId,
        store: Arc<dyn SnapshotStore>,
        bus: Arc<dyn SyncBus>,
    ) -> Self {
        Self {
            instance,
            session_id,
            store,
            bus,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// This instance's identity on the bus.
    pub const fn instance(&self) -> InstanceId {
        self.instance
    }

    /// The session this coordinator serves.
    pub const fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Copy of the current local session state.
    pub async fn snapshot(&self) -> SessionSnapshot {
        self.inner.lock().await.session.snapshot()
    }

    /// Number of live local connections.
    pub async fn connection_count(&self) -> usize {
        self.inner.lock().await.registry.len()
    }

    /// Register a new connection and mint its participant identity.
    pub async fn connect(&self, connection: ConnectionId, outbox: Outbox) -> ParticipantId {
        let participant = self.inner.lock().await.registry.register(connection, outbox);
        debug!(%connection, %participant, "connection registered");
        participant
    }

    /// Decode one inbound text frame and dispatch it.
    ///
    /// Malformed or unknown messages are answered with an error frame to
    /// the sender only; the connection stays open.
    pub async fn handle_text(&self, connection: ConnectionId, text: &str) {
        match ClientMessage::parse(text) {
            Ok(ClientMessage::Join) => self.join(connection).await,
            Ok(ClientMessage::Move { row, col }) => self.make_move(connection, row, col).await,
            Ok(ClientMessage::Reset) => self.reset(connection).await,
            Err(e) => {
                debug!(%connection, error = %e, "rejecting client frame");
                let mut inner = self.inner.lock().await;
                self.reply(&mut inner, connection, &ServerMessage::error(e.to_string()))
                    .await;
            }
        }
    }

    /// Seat the participant behind `connection`.
    ///
    /// The freshest shared snapshot is loaded first so a seat taken on
    /// another instance is honoured.
    pub async fn join(&self, connection: ConnectionId) {
        let mut inner = self.inner.lock().await;
        let Some(participant) = inner.registry.lookup(connection).cloned() else {
            debug!(%connection, "join from unregistered connection");
            return;
        };

        if let Some(shared) = self.load_shared().await {
            inner.session.restore(shared);
        }

        let before = inner.session.revision();
        match inner.session.add_participant(&participant) {
            Ok(mark) => {
                info!(%participant, %mark, "participant joined");
                if inner.session.revision() != before {
                    let payload = SyncPayload::Join {
                        participant_id: participant,
                        state: inner.session.snapshot(),
                    };
                    self.commit(&inner, payload).await;
                }
                self.reply(&mut inner, connection, &ServerMessage::joined(mark))
                    .await;
                let update = ServerMessage::update(inner.session.view());
                self.broadcast(&mut inner, &[update]).await;
            }
            Err(violation) => {
                debug!(%participant, %violation, "join rejected");
                self.reply(&mut inner, connection, &ServerMessage::error(violation.to_string()))
                    .await;
            }
        }
    }

    /// Apply a move for the participant behind `connection`.
    pub async fn make_move(&self, connection: ConnectionId, row: i64, col: i64) {
        let mut inner = self.inner.lock().await;
        let Some(participant) = inner.registry.lookup(connection).cloned() else {
            debug!(%connection, "move from unregistered connection");
            return;
        };

        match inner.session.apply_move(&participant, row, col) {
            Ok(placement) => {
                debug!(%participant, mark = %placement.mark, row, col, "move applied");
                let payload = SyncPayload::Move {
                    participant_id: participant,
                    row: placement.row,
                    col: placement.col,
                    state: inner.session.snapshot(),
                };
                self.commit(&inner, payload).await;

                let mut messages = vec![ServerMessage::update(inner.session.view())];
                if let Some(outcome) = placement.outcome {
                    info!(?outcome, "game finished");
                    messages.push(ServerMessage::outcome(outcome));
                }
                self.broadcast(&mut inner, &messages).await;
            }
            Err(violation) => {
                debug!(%participant, %violation, "move rejected");
                self.reply(&mut inner, connection, &ServerMessage::error(violation.to_string()))
                    .await;
            }
        }
    }

    /// Reset the session on behalf of `connection`.
    pub async fn reset(&self, connection: ConnectionId) {
        let mut inner = self.inner.lock().await;
        let Some(participant) = inner.registry.lookup(connection).cloned() else {
            debug!(%connection, "reset from unregistered connection");
            return;
        };

        inner.session.reset();
        info!(%participant, "session reset");
        let payload = SyncPayload::Reset {
            participant_id: participant,
            state: inner.session.snapshot(),
        };
        self.commit(&inner, payload).await;
        let update = ServerMessage::update(inner.session.view());
        self.broadcast(&mut inner, &[update]).await;
    }

    /// Forget `connection`, unseating its participant if it held a seat.
    pub async fn disconnect(&self, connection: ConnectionId) {
        let mut inner = self.inner.lock().await;
        if self.evict(&mut inner, &[connection]).await {
            let update = ServerMessage::update(inner.session.view());
            self.broadcast(&mut inner, &[update]).await;
        }
    }

    /// Load the shared snapshot at startup so a restarted instance resumes
    /// the game in progress.
    ///
    /// Returns `true` if a stored snapshot was adopted.
    pub async fn resume(&self) -> bool {
        let mut inner = self.inner.lock().await;
        match self.load_shared().await {
            Some(shared) => {
                info!(
                    session = %self.session_id,
                    revision = shared.revision,
                    phase = %shared.phase,
                    "resumed session from store"
                );
                inner.session.restore(shared);
                true
            }
            None => {
                info!(session = %self.session_id, "no stored session; starting empty");
                false
            }
        }
    }

    /// Persist this instance's state and announce it as a `full-sync`.
    ///
    /// Returns the snapshot sent and how far it got.
    pub async fn publish_full_sync(&self) -> (SessionSnapshot, Committed) {
        let inner = self.inner.lock().await;
        let state = inner.session.snapshot();
        info!(revision = state.revision, "publishing full sync");
        let committed = self
            .commit(
                &inner,
                SyncPayload::FullSync {
                    state: state.clone(),
                },
            )
            .await;
        (state, committed)
    }

    /// Subscribe to the sync bus.
    pub async fn subscribe(&self) -> Result<SyncStream, BusError> {
        self.bus.subscribe().await
    }

    /// Apply every event of `events` until the stream ends.
    pub async fn run_sync_listener(self: Arc<Self>, mut events: SyncStream) {
        info!(instance = %self.instance, "sync listener started");
        while let Some(event) = events.next().await {
            self.apply_sync_event(event).await;
        }
        warn!(instance = %self.instance, "sync stream closed");
    }

    /// Reconcile local state with an event published by another instance.
    ///
    /// Every event triggers a reload from the store, which holds whichever
    /// commit landed last. Commits are stored before they are published, so
    /// once all events are processed every instance holds the stored
    /// snapshot. The payload is a fallback only while the store is
    /// unreachable or empty, and only when its revision is newer.
    ///
    /// Returns `true` if local state changed (and was broadcast locally).
    pub async fn apply_sync_event(&self, event: SyncEvent) -> bool {
        if event.origin_instance == self.instance || event.session_id != self.session_id {
            return false;
        }
        let kind = event.payload.kind();
        debug!(origin = %event.origin_instance, kind, "sync event received");

        if let Some(Err(e)) = event.payload.state().map(validate) {
            warn!(kind, error = %e, "ignoring invalid snapshot from bus");
            return false;
        }

        let mut inner = self.inner.lock().await;
        let before = inner.session.snapshot();

        if let Some(shared) = self.load_shared().await {
            inner.session.restore(shared);
        } else if let Some(state) = event.payload.state() {
            if state.revision > before.revision {
                inner.session.restore(state.clone());
            } else {
                debug!(
                    kind,
                    local = before.revision,
                    remote = state.revision,
                    "store unavailable; keeping local state"
                );
            }
        } else if let Some(participant) = event.payload.participant() {
            inner.session.remove_participant(participant);
        }

        let after = inner.session.view();
        if *after == before {
            return false;
        }
        let mut messages = vec![ServerMessage::update(after)];
        if let Some(outcome) = after.outcome.filter(|_| before.phase != Phase::Finished) {
            messages.push(ServerMessage::outcome(outcome));
        }
        self.broadcast(&mut inner, &messages).await;
        true
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Load and validate the stored snapshot. `None` when missing,
    /// unreachable, or invalid.
    async fn load_shared(&self) -> Option<SessionSnapshot> {
        match self.store.load(&self.session_id).await {
            Ok(Some(snapshot)) => match validate(&snapshot) {
                Ok(()) => Some(snapshot),
                Err(e) => {
                    warn!(session = %self.session_id, error = %e, "ignoring invalid stored snapshot");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(session = %self.session_id, error = %e, "snapshot store unavailable");
                None
            }
        }
    }

    /// Persist the current state and publish `payload`.
    ///
    /// Failures are logged and reported, never propagated: the local state
    /// stands either way.
    async fn commit(&self, inner: &Inner, payload: SyncPayload) -> Committed {
        let persisted = match self.store.save(&self.session_id, inner.session.view()).await {
            Ok(()) => true,
            Err(e) => {
                warn!(session = %self.session_id, error = %e, "failed to persist snapshot");
                false
            }
        };
        let kind = payload.kind();
        let event = SyncEvent::new(self.instance, self.session_id.clone(), payload);
        let published = match self.bus.publish(&event).await {
            Ok(()) => true,
            Err(e) => {
                warn!(session = %self.session_id, kind, error = %e, "failed to publish sync event");
                false
            }
        };
        Committed {
            persisted,
            published,
        }
    }

    /// Send `message` to `connection` only. A dead receiver is disconnected.
    async fn reply(&self, inner: &mut Inner, connection: ConnectionId, message: &ServerMessage) {
        let Some(frame) = encode(message) else {
            return;
        };
        if !inner.registry.send_to(connection, frame) && self.evict(inner, &[connection]).await {
            let update = ServerMessage::update(inner.session.view());
            self.broadcast(inner, &[update]).await;
        }
    }

    /// Send `messages` to every local connection.
    ///
    /// Each message is serialized once. Connections whose receiver is gone
    /// go through disconnect handling, and the resulting state is fanned out
    /// again until a round completes without losing a seated participant.
    async fn broadcast(&self, inner: &mut Inner, messages: &[ServerMessage]) {
        let mut frames: Vec<Arc<str>> = messages.iter().filter_map(encode).collect();
        loop {
            let dead = inner.registry.send_all(&frames);
            if !self.evict(inner, &dead).await {
                break;
            }
            frames = encode(&ServerMessage::update(inner.session.view()))
                .into_iter()
                .collect();
        }
    }

    /// Unregister `connections`, unseating, persisting, and publishing a
    /// `leave` for each one that held a seat.
    ///
    /// Returns `true` if the session state changed.
    async fn evict(&self, inner: &mut Inner, connections: &[ConnectionId]) -> bool {
        let mut changed = false;
        for connection in connections {
            let Some(participant) = inner.registry.unregister(*connection) else {
                continue;
            };
            debug!(%connection, %participant, "connection removed");
            if inner.session.remove_participant(&participant) {
                info!(%participant, "participant left");
                self.commit(
                    inner,
                    SyncPayload::Leave {
                        participant_id: participant,
                    },
                )
                .await;
                changed = true;
            }
        }
        changed
    }
}

impl std::fmt::Debug for SessionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCoordinator")
            .field("instance", &self.instance)
            .field("session_id", &self.session_id)
            .finish_non_exhaustive()
    }
}

/// Serialize an outbound frame once for every recipient.
fn encode(message: &ServerMessage) -> Option<Arc<str>> {
    match serde_json::to_string(message) {
        Ok(json) => Some(Arc::from(json)),
        Err(e) => {
            warn!(error = %e, "failed to serialize server message");
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tictac_bus::MemoryBus;
    use tictac_store::MemoryStore;
    use super::*;
    use crate::registry::outbox;

    fn coordinator() -> SessionCoordinator {
        SessionCoordinator::new(
            InstanceId::new(),
            SessionId::default(),
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryBus::default()),
        )
    }

    #[test]
    fn encode_produces_wire_json() {
        let frame = encode(&ServerMessage::error("nope")).unwrap();
        assert_eq!(&*frame, r#"{"type":"error","message":"nope"}"#);
    }

    #[tokio::test]
    async fn own_echo_is_ignored() {
        let coord = coordinator();
        let event = SyncEvent::new(
            coord.instance(),
            SessionId::default(),
            SyncPayload::FullSync {
                state: SessionSnapshot {
                    revision: 9,
                    ..SessionSnapshot::default()
                },
            },
        );
        assert!(!coord.apply_sync_event(event).await);
        assert_eq!(coord.snapshot().await.revision, 0);
    }

    #[tokio::test]
    async fn other_session_is_ignored() {
        let coord = coordinator();
        let event = SyncEvent::new(
            InstanceId::new(),
            SessionId::new("elsewhere"),
            SyncPayload::FullSync {
                state: SessionSnapshot {
                    revision: 9,
                    ..SessionSnapshot::default()
                },
            },
        );
        assert!(!coord.apply_sync_event(event).await);
    }

    #[tokio::test]
    async fn unregistered_connection_is_ignored() {
        let coord = coordinator();
        coord.join(ConnectionId::new()).await;
        assert_eq!(coord.snapshot().await.participant_count(), 0);
    }

    #[tokio::test]
    async fn disconnect_without_seat_only_unregisters() {
        let store = MemoryStore::new();
        let coord = SessionCoordinator::new(
            InstanceId::new(),
            SessionId::default(),
            Arc::new(store.clone()),
            Arc::new(MemoryBus::default()),
        );
        let (tx, _rx) = outbox();
        let conn = ConnectionId::new();
        coord.connect(conn, tx).await;
        coord.disconnect(conn).await;

        assert_eq!(coord.connection_count().await, 0);
        assert_eq!(store.writes(), 0);
    }
}
