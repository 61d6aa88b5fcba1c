//! Core protocol types: everything that travels on the wire.
//!
//! Both directions are JSON objects internally tagged by `"type"`:
//!
//! ```text
//! client → {"type":"move","room":"r1","position":4,"mark":"X"}
//! server → {"type":"move_accepted","room":"r1","position":4,"row":1,"col":1,...}
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::position::BOARD_CELLS;

/// Wire protocol version announced in [`ServerMessage::Welcome`].
pub const PROTOCOL_VERSION: u32 = 1;

/// Room key used when a join does not name one.
pub const DEFAULT_ROOM: &str = "default";

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Caller-chosen room name. Case-sensitive and otherwise arbitrary.
///
/// `#[serde(transparent)]` keeps it a plain JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomKey(String);

impl RoomKey {
    /// Creates a key from any string-like value.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RoomKey {
    fn default() -> Self {
        Self(DEFAULT_ROOM.to_string())
    }
}

impl From<&str> for RoomKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for RoomKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Process-unique id of one room *instance*.
///
/// A key that is destroyed and joined again gets a new `RoomId`, which is
/// how deferred work tells a recreated room apart from the one it was
/// scheduled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub u64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Marks and cells
// ---------------------------------------------------------------------------

/// The symbol a seat plays as. `X` always moves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mark {
    X,
    O,
}

impl Mark {
    /// Both marks, in seat order.
    pub const ALL: [Mark; 2] = [Mark::X, Mark::O];

    /// The other mark.
    pub fn opponent(self) -> Self {
        match self {
            Self::X => Self::O,
            Self::O => Self::X,
        }
    }

    /// Seat index: 0 for `X`, 1 for `O`.
    pub fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::O => 1,
        }
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::X => f.write_str("X"),
            Self::O => f.write_str("O"),
        }
    }
}

/// One square of the board. Empty squares serialize as `""`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Cell {
    #[default]
    #[serde(rename = "")]
    Empty,
    X,
    O,
}

impl Cell {
    /// The mark in this cell, if any.
    pub fn mark(self) -> Option<Mark> {
        match self {
            Self::Empty => None,
            Self::X => Some(Mark::X),
            Self::O => Some(Mark::O),
        }
    }

    pub fn is_empty(self) -> bool {
        self == Self::Empty
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

/// A board snapshot as sent to clients: flat, row-major.
pub type BoardCells = [Cell; BOARD_CELLS];

// ---------------------------------------------------------------------------
// Room status and results
// ---------------------------------------------------------------------------

/// Lifecycle state of a room.
///
/// ```text
/// WaitingForOpponent ──(second seat filled)──→ InProgress
///          ↑                                     │   ↑
///   (seat vacated)                      (win/draw)   (reset)
///          │                                     ↓   │
///          └──────────────────────────────── Finished
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomStatus {
    WaitingForOpponent,
    InProgress,
    Finished,
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WaitingForOpponent => write!(f, "WaitingForOpponent"),
            Self::InProgress => write!(f, "InProgress"),
            Self::Finished => write!(f, "Finished"),
        }
    }
}

/// Result of a finished game. A draw serializes as `"draw"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winner {
    X,
    O,
    #[serde(rename = "draw")]
    Draw,
}

impl From<Mark> for Winner {
    fn from(mark: Mark) -> Self {
        match mark {
            Mark::X => Self::X,
            Mark::O => Self::O,
        }
    }
}

/// Machine-readable error category sent with [`ServerMessage::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    OutOfRange,
    CellOccupied,
    NotYourTurn,
    NotInProgress,
    RoomNotFound,
    RoomFull,
    NotInRoom,
    InvalidIntent,
    Internal,
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// Intents a client can send.
///
/// Aliases accept the event and field names older browser clients use
/// (`join_game`, `make_move`, `gameId`, `symbol`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Join (or create) a room. A missing room means [`DEFAULT_ROOM`].
    #[serde(alias = "join_game")]
    Join {
        #[serde(default, alias = "gameId", alias = "game_id", alias = "roomKey")]
        room: Option<RoomKey>,
    },

    /// Place a mark, either by flat `position` or by `row` + `col`.
    ///
    /// `mark` is optional: the server always plays the mark of the seat the
    /// sender owns and only uses this field to reject mismatches early.
    #[serde(alias = "make_move")]
    Move {
        #[serde(default, alias = "gameId", alias = "game_id", alias = "roomKey")]
        room: Option<RoomKey>,
        #[serde(default)]
        position: Option<i64>,
        #[serde(default)]
        row: Option<i64>,
        #[serde(default)]
        col: Option<i64>,
        #[serde(default, alias = "symbol")]
        mark: Option<Mark>,
    },

    /// Start a fresh round in the sender's room.
    #[serde(alias = "reset_game", alias = "restart_game")]
    Restart {
        #[serde(default, alias = "gameId", alias = "game_id", alias = "roomKey")]
        room: Option<RoomKey>,
    },

    /// Leave the current room without closing the connection.
    Leave {
        #[serde(default, alias = "gameId", alias = "game_id", alias = "roomKey")]
        room: Option<RoomKey>,
    },

    /// Keep-alive; answered with [`ServerMessage::HeartbeatAck`].
    Heartbeat {
        #[serde(default)]
        client_time: u64,
    },

    /// Ask for the number of live rooms.
    Health,
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// Messages the server sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// First message on every connection.
    Welcome { connection: u64, version: u32 },

    /// You hold this seat in `room`.
    Joined { room: RoomKey, mark: Mark },

    /// Your room has one player; waiting for the second.
    Waiting { room: RoomKey },

    /// Both seats are filled; sent to each seat with its own mark.
    GameStart {
        room: RoomKey,
        mark: Mark,
        board: BoardCells,
        turn: Mark,
    },

    /// You joined a full room as a read-only spectator.
    Spectating {
        room: RoomKey,
        board: BoardCells,
        turn: Mark,
        status: RoomStatus,
    },

    /// Current snapshot, re-sent to a seat that joins again.
    GameState {
        room: RoomKey,
        board: BoardCells,
        turn: Mark,
        status: RoomStatus,
    },

    /// A move was applied and the game goes on.
    MoveAccepted {
        room: RoomKey,
        position: usize,
        row: usize,
        col: usize,
        mark: Mark,
        next_turn: Mark,
        board: BoardCells,
    },

    /// The last move ended the game.
    GameOver {
        room: RoomKey,
        winner: Winner,
        winning_line: Option<[usize; 3]>,
        /// The same line as `[row, col]` pairs.
        winning_cells: Option<[[usize; 2]; 3]>,
        board: BoardCells,
    },

    /// The board was cleared for a new round.
    GameRestarted {
        room: RoomKey,
        board: BoardCells,
        turn: Mark,
    },

    /// The other seat left the room.
    OpponentLeft { room: RoomKey, mark: Mark },

    /// The other seat's connection dropped.
    OpponentDisconnected { room: RoomKey, mark: Mark },

    /// The room was destroyed because both seats are empty.
    RoomClosed { room: RoomKey },

    /// Reply to [`ClientMessage::Heartbeat`].
    HeartbeatAck { client_time: u64, server_time: u64 },

    /// Reply to [`ClientMessage::Health`].
    Health { active_rooms: usize },

    /// The sender's last intent was rejected. Never broadcast.
    Error { code: ErrorCode, message: String },
}
