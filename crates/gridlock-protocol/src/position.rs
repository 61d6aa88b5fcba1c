//! Conversion between the wire's 2-D coordinates and the flat board index.
//!
//! The board is stored flat and row-major (`index = row * 3 + col`); clients
//! may address squares either way.

/// Squares per row and per column.
pub const BOARD_SIDE: usize = 3;

/// Total squares on the board.
pub const BOARD_CELLS: usize = BOARD_SIDE * BOARD_SIDE;

/// Why a move's target could not be turned into a flat index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PositionError {
    /// Neither `position` nor a full `row` + `col` pair was given.
    #[error("move needs a position or a row and col")]
    Missing,

    /// The coordinates fall outside the board.
    #[error("position out of range")]
    OutOfRange,
}

/// Flat index for a `(row, col)` pair, or `None` if either is off the board.
pub fn to_index(row: i64, col: i64) -> Option<usize> {
    let row = usize::try_from(row).ok()?;
    let col = usize::try_from(col).ok()?;
    (row < BOARD_SIDE && col < BOARD_SIDE).then_some(row * BOARD_SIDE + col)
}

/// `(row, col)` for a flat index, or `None` past the last square.
pub fn to_coords(index: usize) -> Option<(usize, usize)> {
    (index < BOARD_CELLS).then_some((index / BOARD_SIDE, index % BOARD_SIDE))
}

/// `[row, col]` pairs for a run of flat indices, e.g. a winning line.
pub fn line_coords(line: [usize; 3]) -> Option<[[usize; 2]; 3]> {
    let mut cells = [[0; 2]; 3];
    for (cell, index) in cells.iter_mut().zip(line) {
        let (row, col) = to_coords(index)?;
        *cell = [row, col];
    }
    Some(cells)
}

/// Resolves the target fields of a move intent to a flat index.
///
/// A flat `position` wins when both forms are present.
pub fn resolve(
    position: Option<i64>,
    row: Option<i64>,
    col: Option<i64>,
) -> Result<usize, PositionError> {
    match (position, row, col) {
        (Some(position), _, _) => usize::try_from(position)
            .ok()
            .filter(|p| *p < BOARD_CELLS)
            .ok_or(PositionError::OutOfRange),
        (None, Some(row), Some(col)) => to_index(row, col).ok_or(PositionError::OutOfRange),
        _ => Err(PositionError::Missing),
    }
}
