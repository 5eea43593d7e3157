//! Enumeration types for marks, cells, phases, and outcomes.
//!
//! Internally these are closed enums; on the wire and in the snapshot store
//! they serialize to the fixed string tokens clients already understand
//! (`"X"`, `"O"`, `""`, `"waiting"`, `"in_progress"`, `"finished"`).

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A participant's symbol on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Mark {
    /// Assigned to the first participant; moves first.
    X,
    /// Assigned to the second participant.
    O,
}

impl Mark {
    /// Both marks in assignment order.
    pub const ALL: [Self; 2] = [Self::X, Self::O];

    /// The opposing mark.
    pub const fn other(self) -> Self {
        match self {
            Self::X => Self::O,
            Self::O => Self::X,
        }
    }

    /// The wire token for this mark.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::X => "X",
            Self::O => "O",
        }
    }
}

impl core::fmt::Display for Mark {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contents of one board cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Cell {
    /// Nobody has played here.
    #[default]
    #[serde(rename = "")]
    Empty,
    /// Marked by X.
    X,
    /// Marked by O.
    O,
}

impl Cell {
    /// The mark occupying this cell, if any.
    pub const fn mark(self) -> Option<Mark> {
        match self {
            Self::Empty => None,
            Self::X => Some(Mark::X),
            Self::O => Some(Mark::O),
        }
    }

    /// Whether the cell is still free.
    pub const fn is_empty(self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl From<Mark> for Cell {
    fn from(mark: Mark) -> Self {
        match mark {
            Mark::X => Self::X,
            Mark::O => Self::O,
        }
    }
}

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Phase {
    /// Fewer than two participants; moves are rejected.
    #[default]
    Waiting,
    /// Two participants are seated and moves alternate.
    InProgress,
    /// The board reached a win or a draw.
    Finished,
}

impl Phase {
    /// The wire token for this phase.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::InProgress => "in_progress",
            Self::Finished => "finished",
        }
    }
}

impl core::fmt::Display for Phase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a finished session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Outcome {
    /// The given mark completed a line.
    Win(Mark),
    /// The board filled with no line.
    Draw,
}

impl Outcome {
    /// The winning mark, or `None` for a draw.
    pub const fn winner(self) -> Option<Mark> {
        match self {
            Self::Win(mark) => Some(mark),
            Self::Draw => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn marks_alternate() {
        assert_eq!(Mark::X.other(), Mark::O);
        assert_eq!(Mark::O.other(), Mark::X);
    }

    #[test]
    fn cells_use_wire_tokens() {
        assert_eq!(serde_json::to_string(&Cell::Empty).unwrap(), "\"\"");
        assert_eq!(serde_json::to_string(&Cell::X).unwrap(), "\"X\"");
        let parsed: Cell = serde_json::from_str("\"O\"").unwrap();
        assert_eq!(parsed, Cell::O);
    }

    #[test]
    fn phases_use_snake_case_tokens() {
        assert_eq!(
            serde_json::to_string(&Phase::InProgress).unwrap(),
            "\"in_progress\""
        );
        assert_eq!(Phase::Finished.to_string(), "finished");
    }

    #[test]
    fn outcome_encoding() {
        assert_eq!(
            serde_json::to_string(&Outcome::Win(Mark::X)).unwrap(),
            r#"{"win":"X"}"#
        );
        assert_eq!(serde_json::to_string(&Outcome::Draw).unwrap(), "\"draw\"");
        assert_eq!(Outcome::Draw.winner(), None);
    }
}
