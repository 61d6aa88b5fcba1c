//! Room configuration.

use serde::{Deserialize, Serialize};

/// Per-room settings shared by every room a registry creates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Whether a third joiner becomes a read-only spectator. When `false`,
    /// joining a room with both seats taken fails with `RoomFull`.
    pub allow_spectators: bool,

    /// Maximum number of spectators (0 = unlimited when allowed).
    pub max_spectators: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            allow_spectators: true,
            max_spectators: 0,
        }
    }
}

impl RoomConfig {
    /// Returns `true` if a room that already has `current` spectators
    /// may take one more.
    pub fn admits_spectator(&self, current: usize) -> bool {
        self.allow_spectators && (self.max_spectators == 0 || current < self.max_spectators)
    }
}
