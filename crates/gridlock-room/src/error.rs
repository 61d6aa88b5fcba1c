//! Error types for the room layer.

use gridlock_protocol::{ConnectionId, ErrorCode, RoomKey, RoomStatus};

use crate::BoardError;

/// Errors that can occur during room operations.
///
/// Every variant is recoverable: it is reported to the connection that
/// caused it and nothing else changes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// The target square is off the board.
    #[error("position {0} is off the board")]
    OutOfRange(usize),

    /// The target square already holds a mark.
    #[error("cell {0} is already occupied")]
    CellOccupied(usize),

    /// The sender does not own the seat whose turn it is, or claimed the
    /// wrong mark.
    #[error("not your turn")]
    NotYourTurn,

    /// Moves are only accepted while the room is `InProgress`.
    #[error("game is not in progress (status: {0})")]
    NotInProgress(RoomStatus),

    /// No live room has this key.
    #[error("room {0} not found")]
    RoomNotFound(RoomKey),

    /// Both seats are taken and no spectator slot is available.
    #[error("room {0} is full")]
    RoomFull(RoomKey),

    /// The connection holds no seat (or spectator slot) in this room.
    #[error("{0} is not in room {1}")]
    NotInRoom(ConnectionId, RoomKey),
}

impl RoomError {
    /// Wire category for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::OutOfRange(_) => ErrorCode::OutOfRange,
            Self::CellOccupied(_) => ErrorCode::CellOccupied,
            Self::NotYourTurn => ErrorCode::NotYourTurn,
            Self::NotInProgress(_) => ErrorCode::NotInProgress,
            Self::RoomNotFound(_) => ErrorCode::RoomNotFound,
            Self::RoomFull(_) => ErrorCode::RoomFull,
            Self::NotInRoom(..) => ErrorCode::NotInRoom,
        }
    }
}

impl From<BoardError> for RoomError {
    fn from(err: BoardError) -> Self {
        match err {
            BoardError::OutOfRange(p) => Self::OutOfRange(p),
            BoardError::CellOccupied(p) => Self::CellOccupied(p),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_errors_keep_their_category() {
        let err: RoomError = BoardError::CellOccupied(3).into();
        assert_eq!(err, RoomError::CellOccupied(3));
        assert_eq!(err.code(), ErrorCode::CellOccupied);
    }

    #[test]
    fn test_error_messages() {
        let err = RoomError::RoomFull(RoomKey::from("r1"));
        assert_eq!(err.to_string(), "room r1 is full");
        let err = RoomError::NotInProgress(RoomStatus::Finished);
        assert!(err.to_string().contains("Finished"));
    }
}
