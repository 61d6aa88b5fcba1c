//! Game rules and room lifecycle for Gridlock.
//!
//! Each room is a synchronous state machine behind its own Tokio mutex.
//! The registry owns the map from room key to room and decides when a
//! room is created or destroyed.
//!
//! # Key types
//!
//! - [`Board`] — the 3×3 grid and win/draw evaluation
//! - [`Room`] — seats, turn, status; authorizes and applies moves
//! - [`RoomRegistry`] — get-or-create by key, remove when empty
//! - [`RoomConfig`] — spectator policy shared by all rooms

mod board;
mod config;
mod error;
mod registry;
mod room;

pub use board::{Board, BoardError, Outcome, WIN_LINES};
pub use config::RoomConfig;
pub use error::RoomError;
pub use registry::{Removed, RoomRegistry, SharedRoom};
pub use room::{Departure, JoinOutcome, MoveOutcome, Room};
