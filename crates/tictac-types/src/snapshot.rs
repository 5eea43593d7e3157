//! The serialized form of a session: board and full snapshot.
//!
//! [`SessionSnapshot`] is the unit of persistence (stored under
//! `game_state:<session>`) and of cross-instance reconciliation (embedded
//! in sync events). It carries the whole entity so that restoring it never
//! needs to merge with local state.

use serde::{Deserialize, Serialize};

use crate::enums::{Cell, Mark, Outcome, Phase};
use crate::ids::ParticipantId;

/// Width and height of the board.
pub const BOARD_SIZE: usize = 3;

/// A 3x3 grid of cells, serialized as rows of wire tokens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board([[Cell; BOARD_SIZE]; BOARD_SIZE]);

impl Board {
    /// An empty board.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a board from explicit rows.
    pub const fn from_rows(rows: [[Cell; BOARD_SIZE]; BOARD_SIZE]) -> Self {
        Self(rows)
    }

    /// The cell at `(row, col)`, or `None` when outside the grid.
    pub fn get(&self, row: usize, col: usize) -> Option<Cell> {
        self.0.get(row).and_then(|r| r.get(col)).copied()
    }

    /// Overwrite the cell at `(row, col)`.
    ///
    /// Returns `false` (and changes nothing) when outside the grid.
    pub fn set(&mut self, row: usize, col: usize, cell: Cell) -> bool {
        match self.0.get_mut(row).and_then(|r| r.get_mut(col)) {
            Some(slot) => {
                *slot = cell;
                true
            }
            None => false,
        }
    }

    /// The rows of the board, top to bottom.
    pub const fn rows(&self) -> &[[Cell; BOARD_SIZE]; BOARD_SIZE] {
        &self.0
    }

    /// Every cell in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        self.0.iter().flat_map(|row| row.iter().copied())
    }

    /// Whether no empty cell remains.
    pub fn is_full(&self) -> bool {
        self.cells().all(|c| !c.is_empty())
    }

    /// Whether no cell has been marked.
    pub fn is_empty(&self) -> bool {
        self.cells().all(Cell::is_empty)
    }
}

/// A participant and the mark they were assigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Seat {
    /// Who holds the seat.
    pub participant: ParticipantId,
    /// The mark they play.
    pub mark: Mark,
}

/// Complete serialized session state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// The grid.
    pub board: Board,
    /// The mark whose move is accepted next.
    #[serde(rename = "current_turn")]
    pub turn: Mark,
    /// Lifecycle phase.
    #[serde(rename = "status")]
    pub phase: Phase,
    /// Set once the session is finished.
    #[serde(default)]
    pub outcome: Option<Outcome>,
    /// Seated participants in join order.
    #[serde(rename = "players", default)]
    pub participants: Vec<Seat>,
    /// Mutation counter, bumped by every state change.
    #[serde(default)]
    pub revision: u64,
}

impl SessionSnapshot {
    /// Number of seated participants.
    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    /// The mark held by `participant`, if seated.
    pub fn mark_of(&self, participant: &ParticipantId) -> Option<Mark> {
        self.participants
            .iter()
            .find(|seat| &seat.participant == participant)
            .map(|seat| seat.mark)
    }
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            board: Board::empty(),
            turn: Mark::X,
            phase: Phase::Waiting,
            outcome: None,
            participants: Vec::new(),
            revision: 0,
        }
    }
}
