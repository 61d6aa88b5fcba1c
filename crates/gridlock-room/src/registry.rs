//! Room registry: creates, tracks, and destroys rooms by key.
//!
//! # Locking
//!
//! The registry map and each room have their own lock. Whenever both are
//! held, the map lock is taken first. A room removed from the map is
//! marked retired under both locks, so a caller that fetched the handle
//! just before removal sees the flag and looks the key up again.
//!
//! [`RoomRegistry::take_if_empty`] hands back a [`Removed`] that keeps the
//! map locked. Until it is dropped no new room can appear under the same
//! key, so cleanup addressed by key cannot reach a successor room.

use std::collections::HashMap;
use std::sync::Arc;

use gridlock_protocol::{ConnectionId, RoomKey};
use tokio::sync::{Mutex, MutexGuard};

use crate::{Room, RoomConfig};

/// A room behind its own lock. Operations on one room are serialized;
/// different rooms never contend.
pub type SharedRoom = Arc<Mutex<Room>>;

/// Map from room key to live room.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: Mutex<HashMap<RoomKey, SharedRoom>>,
    config: RoomConfig,
}

impl RoomRegistry {
    /// Creates an empty registry whose rooms use `config`.
    pub fn new(config: RoomConfig) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Returns the room for `key`, creating it if absent.
    ///
    /// Concurrent callers with the same key all get the same room.
    pub async fn get_or_create(&self, key: &RoomKey) -> SharedRoom {
        let mut rooms = self.rooms.lock().await;
        if let Some(room) = rooms.get(key) {
            return Arc::clone(room);
        }
        let room = Room::new(key.clone(), self.config.clone());
        tracing::info!(room = %key, id = %room.id(), "room created");
        let room = Arc::new(Mutex::new(room));
        rooms.insert(key.clone(), Arc::clone(&room));
        room
    }

    /// Returns the live room for `key`, if any.
    pub async fn get(&self, key: &RoomKey) -> Option<SharedRoom> {
        self.rooms.lock().await.get(key).cloned()
    }

    /// Destroys the room for `key` if both its seats are vacant.
    ///
    /// Returns `true` if a room was removed. Calling it again, or for a
    /// missing key, returns `false`.
    pub async fn remove_if_empty(&self, key: &RoomKey) -> bool {
        self.take_if_empty(key).await.is_some()
    }

    /// Like [`remove_if_empty`](Self::remove_if_empty), but keeps the
    /// registry locked until the returned [`Removed`] is dropped.
    pub async fn take_if_empty(&self, key: &RoomKey) -> Option<Removed<'_>> {
        let mut rooms = self.rooms.lock().await;
        let (id, spectators) = {
            let mut room = rooms.get(key)?.lock().await;
            if !room.is_empty() {
                return None;
            }
            room.retire();
            (room.id(), room.spectators().to_vec())
        };
        rooms.remove(key);
        tracing::info!(room = %key, %id, "room destroyed");
        Some(Removed {
            _rooms: rooms,
            spectators,
        })
    }

    /// Number of live rooms.
    pub async fn count(&self) -> usize {
        self.rooms.lock().await.len()
    }
}

/// A room just taken out of the registry.
///
/// Holds the registry lock: every other registry call waits until this is
/// dropped.
pub struct Removed<'a> {
    _rooms: MutexGuard<'a, HashMap<RoomKey, SharedRoom>>,
    spectators: Vec<ConnectionId>,
}

impl Removed<'_> {
    /// Spectators the room had when it was removed.
    pub fn spectators(&self) -> &[ConnectionId] {
        &self.spectators
    }
}
