//! Connection session index for Gridlock.
//!
//! A "session" here is nothing more than the answer to *which room is this
//! connection in?* There are no accounts and no reconnection tokens: a
//! session lives from a join until the matching leave or disconnect.
//!
//! ```text
//! Coordinator (above)  ← routes moves/disconnects through the session index
//!     ↕
//! Session Layer (this crate)  ← ConnectionId → RoomKey
//!     ↕
//! Protocol Layer (below)  ← provides ConnectionId, RoomKey
//! ```

mod map;

pub use map::ConnectionSessionMap;
