//! Terminal-condition rule for the 3x3 grid.
//!
//! A game ends when one mark fills a row, a column, or a diagonal, or when
//! the board is full. The win check always runs first so that a final move
//! completing a line on the last empty cell is reported as a win.

use tictac_types::{Board, Mark, Outcome};

/// Every winning line as `(row, col)` coordinates.
const LINES: [[(usize, usize); 3]; 8] = [
    // Rows
    [(0, 0), (0, 1), (0, 2)],
    [(1, 0), (1, 1), (1, 2)],
    [(2, 0), (2, 1), (2, 2)],
    // Columns
    [(0, 0), (1, 0), (2, 0)],
    [(0, 1), (1, 1), (2, 1)],
    [(0, 2), (1, 2), (2, 2)],
    // Diagonals
    [(0, 0), (1, 1), (2, 2)],
    [(0, 2), (1, 1), (2, 0)],
];

/// The mark owning a complete line, if any.
pub fn winner(board: &Board) -> Option<Mark> {
    LINES.iter().find_map(|line| {
        let mut marks = line
            .iter()
            .map(|&(row, col)| board.get(row, col).and_then(|cell| cell.mark()));
        let first = marks.next().flatten()?;
        marks.all(|m| m == Some(first)).then_some(first)
    })
}

/// Whether the board is terminal, and how.
pub fn evaluate(board: &Board) -> Option<Outcome> {
    if let Some(mark) = winner(board) {
        return Some(Outcome::Win(mark));
    }
    board.is_full().then_some(Outcome::Draw)
}

#[cfg(test)]
mod tests {
    use tictac_types::Cell::{Empty as E, O, X};

    use super::*;

    #[test]
    fn empty_board_is_not_terminal() {
        assert_eq!(evaluate(&Board::empty()), None);
    }

    #[test]
    fn detects_rows_columns_and_diagonals() {
        let row = Board::from_rows([[E, E, E], [O, O, O], [X, X, E]]);
        assert_eq!(winner(&row), Some(Mark::O));

        let col = Board::from_rows([[X, O, E], [X, O, E], [X, E, E]]);
        assert_eq!(winner(&col), Some(Mark::X));

        let diag = Board::from_rows([[X, O, E], [O, X, E], [E, E, X]]);
        assert_eq!(winner(&diag), Some(Mark::X));

        let anti = Board::from_rows([[X, X, O], [E, O, E], [O, E, X]]);
        assert_eq!(winner(&anti), Some(Mark::O));
    }

    #[test]
    fn full_board_without_line_is_a_draw() {
        let board = Board::from_rows([[X, O, X], [X, O, O], [O, X, X]]);
        assert_eq!(evaluate(&board), Some(Outcome::Draw));
    }

    #[test]
    fn win_on_full_board_is_not_a_draw() {
        let board = Board::from_rows([[X, O, X], [O, X, O], [O, X, X]]);
        assert_eq!(evaluate(&board), Some(Outcome::Win(Mark::X)));
    }
}
