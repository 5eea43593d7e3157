//! Sync events exchanged between instances over the bus.
//!
//! Each event names its origin so publishers can drop their own echoes, and
//! every state-changing kind embeds the full snapshot taken right after the
//! mutation. `leave` carries only the departing identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{InstanceId, ParticipantId, SessionId};
use crate::snapshot::SessionSnapshot;

/// Named bus channels, one per event family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Full-state resynchronisation.
    Sync,
    /// A participant took a seat.
    Join,
    /// A participant left.
    Leave,
    /// A move was applied.
    Move,
    /// The session was reset.
    Reset,
}

impl Channel {
    /// The channel's name below the configured prefix.
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Sync => "sync",
            Self::Join => "join",
            Self::Leave => "leave",
            Self::Move => "move",
            Self::Reset => "reset",
        }
    }

    /// The full channel name under `prefix`, e.g. `tic_tac_toe.move`.
    pub fn name(self, prefix: &str) -> String {
        format!("{prefix}.{}", self.suffix())
    }
}

/// Kind-specific body of a [`SyncEvent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum SyncPayload {
    /// A participant was seated.
    Join {
        /// The seated participant.
        participant_id: ParticipantId,
        /// State after the join.
        state: SessionSnapshot,
    },
    /// A move was applied.
    Move {
        /// The moving participant.
        participant_id: ParticipantId,
        /// Row played.
        row: usize,
        /// Column played.
        col: usize,
        /// State after the move.
        state: SessionSnapshot,
    },
    /// A participant disconnected.
    Leave {
        /// The departing participant.
        participant_id: ParticipantId,
    },
    /// The session was reset.
    Reset {
        /// Who asked for the reset.
        participant_id: ParticipantId,
        /// State after the reset.
        state: SessionSnapshot,
    },
    /// Authoritative republish of an instance's whole state.
    FullSync {
        /// The state to adopt.
        state: SessionSnapshot,
    },
}

impl SyncPayload {
    /// The channel this payload travels on.
    pub const fn channel(&self) -> Channel {
        match self {
            Self::Join { .. } => Channel::Join,
            Self::Move { .. } => Channel::Move,
            Self::Leave { .. } => Channel::Leave,
            Self::Reset { .. } => Channel::Reset,
            Self::FullSync { .. } => Channel::Sync,
        }
    }

    /// The embedded snapshot, absent for `leave`.
    pub const fn state(&self) -> Option<&SessionSnapshot> {
        match self {
            Self::Join { state, .. }
            | Self::Move { state, .. }
            | Self::Reset { state, .. }
            | Self::FullSync { state } => Some(state),
            Self::Leave { .. } => None,
        }
    }

    /// The participant the event concerns, if any.
    pub const fn participant(&self) -> Option<&ParticipantId> {
        match self {
            Self::Join { participant_id, .. }
            | Self::Move { participant_id, .. }
            | Self::Leave { participant_id }
            | Self::Reset { participant_id, .. } => Some(participant_id),
            Self::FullSync { .. } => None,
        }
    }

    /// Short label for logs.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::Move { .. } => "move",
            Self::Leave { .. } => "leave",
            Self::Reset { .. } => "reset",
            Self::FullSync { .. } => "full-sync",
        }
    }
}

/// A session mutation announced by one instance to the others.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncEvent {
    /// The publishing instance.
    pub origin_instance: InstanceId,
    /// The session the event belongs to.
    pub session_id: SessionId,
    /// Wall-clock publish time (informational only).
    pub published_at: DateTime<Utc>,
    /// Kind and kind-specific fields.
    #[serde(flatten)]
    pub payload: SyncPayload,
}

impl SyncEvent {
    /// Stamp `payload` with its origin and the current time.
    pub fn new(origin_instance: InstanceId, session_id: SessionId, payload: SyncPayload) -> Self {
        Self {
            origin_instance,
            session_id,
            published_at: Utc::now(),
            payload,
        }
    }

    /// The channel this event is published on.
    pub const fn channel(&self) -> Channel {
        self.payload.channel()
    }
}
