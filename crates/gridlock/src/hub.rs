//! Outbound fan-out: per-connection channels and room broadcast groups.
//!
//! The coordinator never touches a socket. It hands messages to an
//! [`Outbox`], which only queues them; each connection's writer task drains
//! its own queue. Queuing is synchronous and never blocks, so it is safe to
//! do while a room lock is held.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use gridlock_protocol::{ConnectionId, RoomKey, ServerMessage};
use tokio::sync::mpsc;

/// Sending half of a connection's outbound queue.
pub type OutboundSender = mpsc::UnboundedSender<ServerMessage>;

/// Receiving half, owned by the connection's writer task.
pub type OutboundReceiver = mpsc::UnboundedReceiver<ServerMessage>;

/// Addressing primitives the coordinator sends through.
pub trait Outbox: Send + Sync + 'static {
    /// Queues `msg` for one connection. Unknown connections are ignored.
    fn send(&self, conn: ConnectionId, msg: ServerMessage);

    /// Queues `msg` for every member of `room`'s group.
    fn broadcast(&self, room: &RoomKey, msg: ServerMessage);

    /// Adds `conn` to `room`'s group.
    fn enter(&self, room: &RoomKey, conn: ConnectionId);

    /// Removes `conn` from `room`'s group.
    fn exit(&self, room: &RoomKey, conn: ConnectionId);

    /// Drops `room`'s group entirely.
    fn dissolve(&self, room: &RoomKey);
}

#[derive(Debug, Default)]
struct HubState {
    senders: HashMap<ConnectionId, OutboundSender>,
    groups: HashMap<RoomKey, BTreeSet<ConnectionId>>,
}

/// The server's [`Outbox`]: unbounded channels keyed by connection.
#[derive(Debug, Default)]
pub struct ConnectionHub {
    state: Mutex<HubState>,
}

impl ConnectionHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens an outbound queue for `conn` and returns its receiving end.
    pub fn register(&self, conn: ConnectionId) -> OutboundReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().senders.insert(conn, tx);
        tracing::debug!(%conn, "connection registered");
        rx
    }

    /// Closes `conn`'s queue and removes it from every group.
    pub fn unregister(&self, conn: ConnectionId) {
        let mut state = self.lock();
        state.senders.remove(&conn);
        for members in state.groups.values_mut() {
            members.remove(&conn);
        }
        state.groups.retain(|_, members| !members.is_empty());
        tracing::debug!(%conn, "connection unregistered");
    }

    /// Members of `room`'s group, in id order.
    pub fn members(&self, room: &RoomKey) -> Vec<ConnectionId> {
        self.lock()
            .groups
            .get(room)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Number of registered connections.
    pub fn connection_count(&self) -> usize {
        self.lock().senders.len()
    }

    // Every critical section leaves both maps consistent, so a poisoned
    // lock is still usable.
    fn lock(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl HubState {
    fn send_to(&self, conn: ConnectionId, msg: ServerMessage) {
        if let Some(sender) = self.senders.get(&conn) {
            if sender.send(msg).is_err() {
                tracing::debug!(%conn, "outbound queue closed");
            }
        }
    }
}

impl Outbox for ConnectionHub {
    fn send(&self, conn: ConnectionId, msg: ServerMessage) {
        self.lock().send_to(conn, msg);
    }

    fn broadcast(&self, room: &RoomKey, msg: ServerMessage) {
        let state = self.lock();
        let Some(members) = state.groups.get(room) else {
            return;
        };
        for conn in members {
            state.send_to(*conn, msg.clone());
        }
    }

    fn enter(&self, room: &RoomKey, conn: ConnectionId) {
        self.lock().groups.entry(room.clone()).or_default().insert(conn);
    }

    fn exit(&self, room: &RoomKey, conn: ConnectionId) {
        let mut state = self.lock();
        if let Some(members) = state.groups.get_mut(room) {
            members.remove(&conn);
            if members.is_empty() {
                state.groups.remove(room);
            }
        }
    }

    fn dissolve(&self, room: &RoomKey) {
        self.lock().groups.remove(room);
    }
}
