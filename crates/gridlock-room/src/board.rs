//! The 3×3 board: a pure value type plus win/draw evaluation.

use gridlock_protocol::{BOARD_CELLS, BoardCells, Cell, Mark};
use serde::{Deserialize, Serialize};

/// The eight winning triples, in evaluation order: rows, columns, diagonals.
pub const WIN_LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// Why a mark could not be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    #[error("position {0} is off the board")]
    OutOfRange(usize),

    #[error("cell {0} is already occupied")]
    CellOccupied(usize),
}

/// Result of evaluating a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    InProgress,
    /// `line` is the first winning triple found, for highlighting.
    Win { mark: Mark, line: [usize; 3] },
    Draw,
}

/// Nine cells, flat and row-major.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Board {
    cells: BoardCells,
}

impl Board {
    /// An empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a board from a full cell array.
    pub fn from_cells(cells: BoardCells) -> Self {
        Self { cells }
    }

    /// Writes `mark` into `position`.
    ///
    /// Touches exactly one cell on success and nothing on failure.
    pub fn apply(&mut self, position: usize, mark: Mark) -> Result<(), BoardError> {
        let cell = self
            .cells
            .get_mut(position)
            .ok_or(BoardError::OutOfRange(position))?;
        if !cell.is_empty() {
            return Err(BoardError::CellOccupied(position));
        }
        *cell = mark.into();
        Ok(())
    }

    /// Win is checked before draw, so a full board with a line is a win.
    pub fn evaluate(&self) -> Outcome {
        for line in WIN_LINES {
            let [a, b, c] = line;
            if let Some(mark) = self.cells[a].mark() {
                if self.cells[b] == self.cells[a] && self.cells[c] == self.cells[a] {
                    return Outcome::Win { mark, line };
                }
            }
        }
        if self.is_full() {
            Outcome::Draw
        } else {
            Outcome::InProgress
        }
    }

    pub fn reset(&mut self) {
        self.cells = [Cell::Empty; BOARD_CELLS];
    }

    /// The cell at `position`, or `None` off the board.
    pub fn get(&self, position: usize) -> Option<Cell> {
        self.cells.get(position).copied()
    }

    /// Snapshot of all cells.
    pub fn cells(&self) -> BoardCells {
        self.cells
    }

    /// Number of non-empty cells.
    pub fn filled(&self) -> usize {
        self.cells.iter().filter(|c| !c.is_empty()).count()
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|c| !c.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|c| c.is_empty())
    }

    /// The same position with every X and O swapped.
    pub fn relabeled(&self) -> Self {
        let mut cells = self.cells;
        for cell in &mut cells {
            *cell = match *cell {
                Cell::Empty => Cell::Empty,
                Cell::X => Cell::O,
                Cell::O => Cell::X,
            };
        }
        Self { cells }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    const E: Cell = Cell::Empty;
    const X: Cell = Cell::X;
    const O: Cell = Cell::O;

    #[test]
    fn test_new_board_is_empty_and_in_progress() {
        let board = Board::new();
        assert!(board.is_empty());
        assert_eq!(board.evaluate(), Outcome::InProgress);
    }

    #[test]
    fn test_apply_writes_single_cell() {
        let mut board = Board::new();
        board.apply(4, Mark::X).unwrap();
        assert_eq!(board.get(4), Some(Cell::X));
        assert_eq!(board.filled(), 1);
    }

    #[test]
    fn test_apply_out_of_range() {
        let mut board = Board::new();
        assert_eq!(board.apply(9, Mark::X), Err(BoardError::OutOfRange(9)));
        assert!(board.is_empty());
    }

    #[test]
    fn test_apply_on_occupied_cell_leaves_board_unchanged() {
        let mut board = Board::new();
        board.apply(0, Mark::X).unwrap();
        let before = board;

        assert_eq!(board.apply(0, Mark::O), Err(BoardError::CellOccupied(0)));
        assert_eq!(board.apply(0, Mark::X), Err(BoardError::CellOccupied(0)));
        assert_eq!(board, before);
    }

    #[test]
    fn test_every_line_wins_for_both_marks() {
        for line in WIN_LINES {
            for mark in Mark::ALL {
                let mut board = Board::new();
                for position in line {
                    board.apply(position, mark).unwrap();
                }
                assert_eq!(
                    board.evaluate(),
                    Outcome::Win { mark, line },
                    "line {line:?} for {mark}"
                );
            }
        }
    }

    #[test]
    fn test_full_board_without_line_is_draw() {
        //  X | O | X
        //  X | O | O
        //  O | X | X
        let board = Board::from_cells([X, O, X, X, O, O, O, X, X]);
        assert_eq!(board.evaluate(), Outcome::Draw);
    }

    #[test]
    fn test_full_board_with_line_is_win_not_draw() {
        //  X | X | X
        //  O | O | X
        //  X | O | O
        let board = Board::from_cells([X, X, X, O, O, X, X, O, O]);
        assert!(board.is_full());
        assert_eq!(
            board.evaluate(),
            Outcome::Win { mark: Mark::X, line: [0, 1, 2] }
        );
    }

    #[test]
    fn test_first_line_in_order_is_reported() {
        //  X | X | X
        //  . | O | .
        //  X | O | .   -- row 0 and column 0 both complete
        let board = Board::from_cells([X, X, X, E, O, E, X, O, E]);
        assert_eq!(
            board.evaluate(),
            Outcome::Win { mark: Mark::X, line: [0, 1, 2] }
        );
    }

    #[test]
    fn test_mixed_line_does_not_win() {
        let board = Board::from_cells([X, O, X, E, E, E, E, E, E]);
        assert_eq!(board.evaluate(), Outcome::InProgress);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut board = Board::from_cells([X, O, X, E, E, E, E, E, O]);
        board.reset();
        assert!(board.is_empty());
        board.reset();
        assert_eq!(board, Board::new());
    }

    #[test]
    fn test_evaluate_symmetric_under_relabeling() {
        let mut rng = rand::rng();
        for _ in 0..500 {
            let mut cells = [E; BOARD_CELLS];
            for cell in &mut cells {
                *cell = match rng.random_range(0..3) {
                    0 => E,
                    1 => X,
                    _ => O,
                };
            }
            let board = Board::from_cells(cells);
            let swapped = match board.evaluate() {
                Outcome::Win { mark, line } => Outcome::Win { mark: mark.opponent(), line },
                other => other,
            };
            assert_eq!(board.relabeled().evaluate(), swapped, "board {cells:?}");
        }
    }
}
