//! Client-facing wire protocol.
//!
//! Every frame is a JSON object with a `type` discriminator. Inbound frames
//! decode into [`ClientMessage`]; outbound frames are [`ServerMessage`]s.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{Mark, Outcome, Phase};
use crate::ids::ParticipantId;
use crate::snapshot::{Board, SessionSnapshot};

/// A command sent by a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ClientMessage {
    /// Ask for a seat in the session.
    Join,
    /// Place this participant's mark.
    Move {
        /// Zero-based row.
        row: i64,
        /// Zero-based column.
        col: i64,
    },
    /// Clear the board and unseat everyone.
    Reset,
}

/// Why an inbound frame could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// Not JSON, not an object, or fields of the wrong shape.
    #[error("Invalid JSON message")]
    InvalidJson,

    /// A well-formed frame whose `type` is not recognised.
    #[error("Unknown message type: {0}")]
    UnknownType(String),
}

impl ClientMessage {
    /// Decode a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::UnknownType`] when the `type` field names no
    /// known command, and [`ProtocolError::InvalidJson`] for anything else
    /// that does not decode.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|_e| ProtocolError::InvalidJson)?;
        let kind = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .ok_or(ProtocolError::InvalidJson)?;
        match kind {
            "join" | "move" | "reset" => {
                serde_json::from_value(value).map_err(|_e| ProtocolError::InvalidJson)
            }
            other => Err(ProtocolError::UnknownType(other.to_owned())),
        }
    }
}

/// Public view of the session pushed to every connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct StateUpdate {
    /// Rows of `"X"`, `"O"` and `""`.
    #[ts(type = "Array<Array<Cell>>")]
    pub board: Board,
    /// The mark expected to move next.
    pub next_turn: Mark,
    /// Lifecycle phase.
    pub status: Phase,
    /// Number of seated participants.
    pub player_count: usize,
    /// Participant identity to mark.
    pub players: BTreeMap<ParticipantId, Mark>,
}

impl From<&SessionSnapshot> for StateUpdate {
    fn from(snapshot: &SessionSnapshot) -> Self {
        Self {
            board: snapshot.board,
            next_turn: snapshot.turn,
            status: snapshot.phase,
            player_count: snapshot.participant_count(),
            players: snapshot
                .participants
                .iter()
                .map(|seat| (seat.participant.clone(), seat.mark))
                .collect(),
        }
    }
}

/// A frame sent by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ServerMessage {
    /// Seat confirmation, sent only to the joining connection.
    Joined {
        /// The mark assigned to the requester.
        #[serde(rename = "playerId")]
        player_id: Mark,
        /// Human-readable confirmation.
        message: String,
    },
    /// Current session state.
    Update(StateUpdate),
    /// Follows the final `update` of a game won by `winner`.
    Win {
        /// The winning mark.
        winner: Mark,
    },
    /// Follows the final `update` of a drawn game.
    Draw,
    /// A request was rejected; sent only to the requester.
    Error {
        /// Reason for the rejection.
        message: String,
    },
}

impl ServerMessage {
    /// Seat confirmation for `mark`.
    pub fn joined(mark: Mark) -> Self {
        Self::Joined {
            player_id: mark,
            message: format!("Joined game as player {mark}"),
        }
    }

    /// Error reply carrying `message`.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// State update for `snapshot`.
    pub fn update(snapshot: &SessionSnapshot) -> Self {
        Self::Update(StateUpdate::from(snapshot))
    }

    /// The terminal announcement for `outcome`.
    pub const fn outcome(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Win(winner) => Self::Win { winner },
            Outcome::Draw => Self::Draw,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::enums::Cell;
    use crate::snapshot::Seat;

    #[test]
    fn parses_known_commands() {
        assert_eq!(ClientMessage::parse(r#"{"type":"join"}"#), Ok(ClientMessage::Join));
        assert_eq!(
            ClientMessage::parse(r#"{"type":"move","row":1,"col":2}"#),
            Ok(ClientMessage::Move { row: 1, col: 2 })
        );
        assert_eq!(ClientMessage::parse(r#"{"type":"reset"}"#), Ok(ClientMessage::Reset));
    }

    #[test]
    fn negative_coordinates_still_decode() {
        assert_eq!(
            ClientMessage::parse(r#"{"type":"move","row":-1,"col":0}"#),
            Ok(ClientMessage::Move { row: -1, col: 0 })
        );
    }

    #[test]
    fn unknown_type_is_reported_by_name() {
        let err = ClientMessage::parse(r#"{"type":"chat","text":"hi"}"#).unwrap_err();
        assert_eq!(err.to_string(), "Unknown message type: chat");
    }

    #[test]
    fn malformed_frames_are_invalid_json() {
        for frame in [
            "not json",
            "[1,2]",
            r#"{"row":1}"#,
            r#"{"type":7}"#,
            r#"{"type":"move","row":"a","col":0}"#,
            r#"{"type":"move"}"#,
        ] {
            assert_eq!(
                ClientMessage::parse(frame),
                Err(ProtocolError::InvalidJson),
                "frame: {frame}"
            );
        }
        assert_eq!(ProtocolError::InvalidJson.to_string(), "Invalid JSON message");
    }

    #[test]
    fn update_frame_shape() {
        let mut snapshot = SessionSnapshot::default();
        snapshot.board.set(0, 0, Cell::X);
        snapshot.participants.push(Seat {
            participant: ParticipantId::from("p1"),
            mark: Mark::X,
        });
        let json = serde_json::to_value(ServerMessage::update(&snapshot)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "update",
                "board": [["X", "", ""], ["", "", ""], ["", "", ""]],
                "nextTurn": "X",
                "status": "waiting",
                "playerCount": 1,
                "players": {"p1": "X"}
            })
        );
    }

    #[test]
    fn reply_frame_shapes() {
        let joined = serde_json::to_value(ServerMessage::joined(Mark::O)).unwrap();
        assert_eq!(joined["type"], "joined");
        assert_eq!(joined["playerId"], "O");

        let win = serde_json::to_value(ServerMessage::outcome(Outcome::Win(Mark::X))).unwrap();
        assert_eq!(win, serde_json::json!({"type": "win", "winner": "X"}));

        let draw = serde_json::to_value(ServerMessage::outcome(Outcome::Draw)).unwrap();
        assert_eq!(draw, serde_json::json!({"type": "draw"}));

        let error = serde_json::to_value(ServerMessage::error("Game is full")).unwrap();
        assert_eq!(
            error,
            serde_json::json!({"type": "error", "message": "Game is full"})
        );
    }
}
