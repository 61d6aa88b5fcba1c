//! # Gridlock
//!
//! Room-based two-player tic-tac-toe over WebSocket.
//!
//! Clients connect, join a named room, and take turns on a 3×3 board. The
//! server owns all game state: it seats players, checks every move against
//! the seat that sent it, announces the result, and clears the board a few
//! seconds after each game ends.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gridlock::prelude::*;
//!
//! # async fn start() -> Result<(), GridlockError> {
//! let server = GameServer::builder()
//!     .config(ServerConfig::from_env()?)
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod coordinator;
mod error;
mod handler;
pub mod hub;
mod server;

pub use config::{
    ConfigError, DEFAULT_BIND_ADDR, DEFAULT_IDLE_TIMEOUT, DEFAULT_RESET_DELAY, ServerConfig,
};
pub use coordinator::GameCoordinator;
pub use error::GridlockError;
pub use hub::{ConnectionHub, Outbox};
pub use server::{GameServer, GameServerBuilder};

/// Everything needed to run a server or talk to one.
pub mod prelude {
    pub use crate::{
        ConfigError, ConnectionHub, GameCoordinator, GameServer, GameServerBuilder, GridlockError,
        Outbox, ServerConfig,
    };
    pub use gridlock_protocol::{
        BoardCells, Cell, ClientMessage, Codec, ConnectionId, ErrorCode, JsonCodec, Mark,
        PROTOCOL_VERSION, RoomKey, RoomStatus, ServerMessage, Winner,
    };
    pub use gridlock_room::RoomConfig;
}
