//! Unified error type for the Gridlock server.

use gridlock_protocol::{ErrorCode, PositionError, ProtocolError};
use gridlock_room::RoomError;
use gridlock_transport::TransportError;

use crate::ConfigError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum GridlockError {
    /// A transport-level error (bind, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A move's target could not be turned into a board index.
    #[error(transparent)]
    Position(#[from] PositionError),

    /// A room rejected the intent.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// The server configuration is malformed.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl GridlockError {
    /// Wire category reported to the client that caused this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Room(err) => err.code(),
            Self::Position(PositionError::OutOfRange) => ErrorCode::OutOfRange,
            Self::Position(PositionError::Missing) | Self::Protocol(_) => ErrorCode::InvalidIntent,
            Self::Transport(_) | Self::Config(_) => ErrorCode::Internal,
        }
    }
}
