//! Wire protocol for Gridlock.
//!
//! - **Types** ([`ClientMessage`], [`ServerMessage`], [`Mark`], [`Cell`], ...)
//!   — the messages that travel between browser and server.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those messages become
//!   bytes.
//! - **Position** ([`position`]) — 2-D ↔ flat board coordinates.
//!
//! ```text
//! Transport (bytes) → Protocol (ClientMessage) → Coordinator (rooms)
//! ```

mod codec;
mod error;
pub mod position;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use gridlock_transport::ConnectionId;
pub use position::{BOARD_CELLS, BOARD_SIDE, PositionError};
pub use types::{
    BoardCells, Cell, ClientMessage, DEFAULT_ROOM, ErrorCode, Mark, PROTOCOL_VERSION, RoomId,
    RoomKey, RoomStatus, ServerMessage, Winner,
};
