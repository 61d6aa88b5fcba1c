//! The session map: which room each live connection currently occupies.
//!
//! # Concurrency note
//!
//! The map owns its lock. Callers never see the `HashMap`; every access is
//! one short critical section with no `.await` inside, so the lock is never
//! held across I/O.

use std::collections::HashMap;

use gridlock_protocol::{ConnectionId, RoomKey};
use tokio::sync::Mutex;

/// Index from connection to the room it is bound to.
///
/// A connection is bound to at most one room at a time. Binding a
/// connection that is already bound replaces the old entry and hands the
/// old key back, so the caller can leave that room first.
///
/// ## Lifecycle
///
/// ```text
/// join ──→ bind() ──→ lookup() … ──→ leave/disconnect ──→ unbind()
///            │
///            └── join elsewhere ──→ bind() returns the previous key
/// ```
#[derive(Debug, Default)]
pub struct ConnectionSessionMap {
    sessions: Mutex<HashMap<ConnectionId, RoomKey>>,
}

impl ConnectionSessionMap {
    /// Creates an empty session map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `conn` to `key`, returning the room it was bound to before.
    pub async fn bind(&self, conn: ConnectionId, key: RoomKey) -> Option<RoomKey> {
        let previous = self.sessions.lock().await.insert(conn, key.clone());
        match &previous {
            Some(old) if *old != key => {
                tracing::debug!(%conn, from = %old, to = %key, "session rebound");
            }
            Some(_) => {}
            None => tracing::debug!(%conn, room = %key, "session bound"),
        }
        previous
    }

    /// Removes the binding for `conn`, returning the room it was in.
    pub async fn unbind(&self, conn: ConnectionId) -> Option<RoomKey> {
        let removed = self.sessions.lock().await.remove(&conn);
        if let Some(key) = &removed {
            tracing::debug!(%conn, room = %key, "session unbound");
        }
        removed
    }

    /// Removes the binding for `conn` only if it still points at `key`.
    ///
    /// Used when a room closes under connections that may have moved on.
    pub async fn unbind_from(&self, conn: ConnectionId, key: &RoomKey) -> bool {
        let mut sessions = self.sessions.lock().await;
        if sessions.get(&conn) != Some(key) {
            return false;
        }
        sessions.remove(&conn);
        tracing::debug!(%conn, room = %key, "session unbound");
        true
    }

    /// Returns the room `conn` is bound to, if any.
    pub async fn lookup(&self, conn: ConnectionId) -> Option<RoomKey> {
        self.sessions.lock().await.get(&conn).cloned()
    }

    /// Number of bound connections.
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Returns `true` if no connection is bound.
    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}
