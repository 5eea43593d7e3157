//! Session state model and rule engine.
//!
//! Pure, I/O-free model of one two-party game on a 3x3 grid. The
//! coordinator owns one [`SessionState`] per instance and drives it through
//! the session commands; persistence and replication happen elsewhere,
//! always through [`SessionState::snapshot`] and [`SessionState::restore`].
//!
//! # Modules
//!
//! - [`state`] -- [`SessionState`], its commands, and snapshot validation
//! - [`rules`] -- Win and draw detection
//!
//! # Usage
//!
//! ```
//! use tictac_session::SessionState;
//! use tictac_types::{Mark, Outcome, ParticipantId, Phase};
//!
//! let (alice, bob) = (ParticipantId::from("alice"), ParticipantId::from("bob"));
//! let mut session = SessionState::new();
//! assert_eq!(session.add_participant(&alice), Ok(Mark::X));
//! assert_eq!(session.add_participant(&bob), Ok(Mark::O));
//! assert_eq!(session.phase(), Phase::InProgress);
//!
//! for (who, row, col) in [(&alice, 0, 0), (&bob, 1, 0), (&alice, 0, 1), (&bob, 1, 1)] {
//!     session.apply_move(who, row, col).ok();
//! }
//! let last = session.apply_move(&alice, 0, 2).ok().and_then(|p| p.outcome);
//! assert_eq!(last, Some(Outcome::Win(Mark::X)));
//! ```

pub mod rules;
pub mod state;

pub use state::{MAX_PARTICIPANTS, Placement, SessionState, validate};

use tictac_types::{Mark, ParticipantId};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// A command rejected by the game rules.
///
/// The display text is what the requesting client sees.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleViolation {
    /// Moves are only accepted while two participants are playing.
    #[error("Game is not in progress")]
    NotInProgress,

    /// The requester holds no seat.
    #[error("Player not in game")]
    UnknownParticipant,

    /// The requester's mark is not the one to move.
    #[error("Not your turn. Current turn: {current}")]
    WrongTurn {
        /// The mark that is expected to move.
        current: Mark,
    },

    /// Row or column outside the grid.
    #[error("Invalid coordinates. Use 0-2 for row and column")]
    OutOfBounds,

    /// The target cell already holds a mark.
    #[error("Cell is already occupied")]
    CellOccupied,

    /// Both seats are taken.
    #[error("Game is full")]
    GameFull,
}

/// A snapshot that breaks the session invariants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidSnapshot {
    /// More seats than the game allows.
    #[error("snapshot seats {0} participants")]
    TooManyParticipants(usize),

    /// Two seats share a mark.
    #[error("snapshot assigns mark {0} twice")]
    DuplicateMark(Mark),

    /// The same participant is seated twice.
    #[error("snapshot seats participant {0} twice")]
    DuplicateParticipant(ParticipantId),

    /// Phase, outcome and board disagree.
    #[error("inconsistent snapshot: {0}")]
    PhaseMismatch(&'static str),
}
