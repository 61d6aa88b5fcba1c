//! The game coordinator: turns client intents into room operations and
//! fans the results out to the affected connections.
//!
//! # Ordering
//!
//! Every message describing a room event is queued while that room's lock
//! is held, so all members see events in the order they were applied. The
//! registry lock is only ever taken before a room lock, never while one is
//! held.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use gridlock_protocol::{
    ClientMessage, ConnectionId, ErrorCode, Mark, PositionError, RoomId, RoomKey, ServerMessage,
    position,
};
use gridlock_room::{
    Departure, JoinOutcome, MoveOutcome, Room, RoomConfig, RoomError, RoomRegistry, SharedRoom,
};
use gridlock_session::ConnectionSessionMap;
use tokio::sync::MutexGuard;
use tokio::time::Instant;

use crate::{GridlockError, Outbox};

/// How a connection left its room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    Left,
    Disconnected,
}

/// Shared game state plus the outbox it reports through.
///
/// Cloning is cheap: every clone points at the same registry, session map,
/// and outbox.
pub struct GameCoordinator<O: Outbox> {
    registry: Arc<RoomRegistry>,
    sessions: Arc<ConnectionSessionMap>,
    outbox: Arc<O>,
    reset_delay: Duration,
    started: Instant,
}

impl<O: Outbox> Clone for GameCoordinator<O> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            sessions: Arc::clone(&self.sessions),
            outbox: Arc::clone(&self.outbox),
            reset_delay: self.reset_delay,
            started: self.started,
        }
    }
}

impl<O: Outbox> GameCoordinator<O> {
    /// Creates a coordinator with an empty registry.
    pub fn new(outbox: Arc<O>, room_config: RoomConfig, reset_delay: Duration) -> Self {
        Self {
            registry: Arc::new(RoomRegistry::new(room_config)),
            sessions: Arc::new(ConnectionSessionMap::new()),
            outbox,
            reset_delay,
            started: Instant::now(),
        }
    }

    /// Number of live rooms.
    pub async fn active_rooms(&self) -> usize {
        self.registry.count().await
    }

    /// The room `conn` is currently bound to.
    pub async fn room_of(&self, conn: ConnectionId) -> Option<RoomKey> {
        self.sessions.lookup(conn).await
    }

    /// Handles one intent from `conn`.
    ///
    /// Never fails: rejections and panics are reported to `conn` as an
    /// error message and nothing else is affected.
    pub async fn handle(&self, conn: ConnectionId, msg: ClientMessage) {
        let result = AssertUnwindSafe(self.dispatch(conn, msg))
            .catch_unwind()
            .await;

        match result {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::debug!(%conn, error = %err, "intent rejected");
                self.send_error(conn, err.code(), err.to_string());
            }
            Err(_) => {
                tracing::error!(%conn, "intent handler panicked");
                self.send_error(conn, ErrorCode::Internal, "internal error".into());
            }
        }
    }

    async fn dispatch(&self, conn: ConnectionId, msg: ClientMessage) -> Result<(), GridlockError> {
        match msg {
            ClientMessage::Join { room } => self.join(conn, room.unwrap_or_default()).await,
            ClientMessage::Move {
                room,
                position,
                row,
                col,
                mark,
            } => {
                let position = position::resolve(position, row, col)?;
                self.make_move(conn, room, position, mark).await
            }
            ClientMessage::Restart { room } => self.restart(conn, room).await,
            ClientMessage::Leave { room } => self.leave(conn, room).await,
            ClientMessage::Heartbeat { client_time } => {
                let server_time =
                    u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);
                self.outbox.send(
                    conn,
                    ServerMessage::HeartbeatAck {
                        client_time,
                        server_time,
                    },
                );
                Ok(())
            }
            ClientMessage::Health => {
                let active_rooms = self.active_rooms().await;
                self.outbox.send(conn, ServerMessage::Health { active_rooms });
                Ok(())
            }
        }
    }

    // -- Join ---------------------------------------------------------------

    /// Seats `conn` in `key`'s room, creating the room if needed.
    ///
    /// A connection bound to another room leaves it first.
    pub async fn join(&self, conn: ConnectionId, key: RoomKey) -> Result<(), GridlockError> {
        if let Some(previous) = self.sessions.lookup(conn).await {
            if previous != key {
                tracing::debug!(%conn, from = %previous, to = %key, "switching rooms");
                self.depart(conn, &previous, Exit::Left).await?;
            }
        }

        loop {
            let shared = self.registry.get_or_create(&key).await;
            let mut room = shared.lock().await;
            if room.is_retired() {
                // Removed between lookup and lock; the next lookup creates
                // a fresh instance.
                continue;
            }

            let outcome = room.join(conn)?;
            self.sessions.bind(conn, key.clone()).await;
            self.outbox.enter(&key, conn);
            self.announce_join(&room, conn, outcome);
            return Ok(());
        }
    }

    fn announce_join(&self, room: &Room, conn: ConnectionId, outcome: JoinOutcome) {
        let key = room.key().clone();
        let board = room.board().cells();
        let turn = room.turn();

        match outcome {
            JoinOutcome::Seated { mark, started } => {
                tracing::debug!(room = %key, %conn, %mark, started, "announcing join");
                self.outbox.send(conn, ServerMessage::Joined { room: key.clone(), mark });
                if !started {
                    self.outbox.send(conn, ServerMessage::Waiting { room: key });
                    return;
                }
                for seat in Mark::ALL {
                    if let Some(player) = room.seat(seat) {
                        self.outbox.send(
                            player,
                            ServerMessage::GameStart {
                                room: key.clone(),
                                mark: seat,
                                board,
                                turn,
                            },
                        );
                    }
                }
                for spectator in room.spectators() {
                    self.outbox.send(*spectator, self.snapshot(room));
                }
            }
            JoinOutcome::Rejoined { mark } => {
                self.outbox.send(conn, ServerMessage::Joined { room: key, mark });
                self.outbox.send(conn, self.snapshot(room));
            }
            JoinOutcome::Spectating => {
                tracing::debug!(room = %key, %conn, "announcing spectator");
                self.outbox.send(
                    conn,
                    ServerMessage::Spectating {
                        room: key,
                        board,
                        turn,
                        status: room.status(),
                    },
                );
            }
        }
    }

    fn snapshot(&self, room: &Room) -> ServerMessage {
        ServerMessage::GameState {
            room: room.key().clone(),
            board: room.board().cells(),
            turn: room.turn(),
            status: room.status(),
        }
    }

    // -- Move ---------------------------------------------------------------

    /// Plays `position` for `conn`.
    ///
    /// An explicit `room` is looked up but never created; otherwise the
    /// connection's bound room is used.
    pub async fn make_move(
        &self,
        conn: ConnectionId,
        room: Option<RoomKey>,
        position: usize,
        claimed: Option<Mark>,
    ) -> Result<(), GridlockError> {
        let key = match room {
            Some(key) => key,
            None => self.sessions.lookup(conn).await.unwrap_or_default(),
        };
        let (row, col) = position::to_coords(position).ok_or(PositionError::OutOfRange)?;
        let shared = self.live_room(&key).await?;
        let mut room = lock_live(&shared, &key).await?;

        match room.make_move(conn, position, claimed)? {
            MoveOutcome::Accepted {
                position,
                mark,
                next_turn,
            } => {
                tracing::debug!(room = %key, %conn, position, %mark, "move accepted");
                self.outbox.broadcast(
                    &key,
                    ServerMessage::MoveAccepted {
                        room: key.clone(),
                        position,
                        row,
                        col,
                        mark,
                        next_turn,
                        board: room.board().cells(),
                    },
                );
            }
            MoveOutcome::GameOver { winner, line, .. } => {
                self.outbox.broadcast(
                    &key,
                    ServerMessage::GameOver {
                        room: key.clone(),
                        winner,
                        winning_line: line,
                        winning_cells: line.and_then(position::line_coords),
                        board: room.board().cells(),
                    },
                );
                self.schedule_reset(key.clone(), room.id(), room.round());
            }
        }
        Ok(())
    }

    /// Resets the room after `reset_delay`, unless someone got there first.
    fn schedule_reset(&self, key: RoomKey, id: RoomId, round: u64) {
        let this = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(this.reset_delay).await;
            this.run_scheduled_reset(&key, id, round).await;
        });
    }

    async fn run_scheduled_reset(&self, key: &RoomKey, id: RoomId, round: u64) {
        let Some(shared) = self.registry.get(key).await else {
            tracing::debug!(room = %key, "scheduled reset for a closed room");
            return;
        };
        let mut room = shared.lock().await;
        if room.id() != id || room.is_retired() {
            tracing::debug!(room = %key, %id, "scheduled reset for a replaced room");
            return;
        }
        if room.reset_finished_round(round) {
            self.broadcast_restart(&room);
        }
    }

    fn broadcast_restart(&self, room: &Room) {
        self.outbox.broadcast(
            room.key(),
            ServerMessage::GameRestarted {
                room: room.key().clone(),
                board: room.board().cells(),
                turn: room.turn(),
            },
        );
    }

    // -- Restart ------------------------------------------------------------

    /// Starts a fresh round. Only a seated player may ask.
    pub async fn restart(
        &self,
        conn: ConnectionId,
        room: Option<RoomKey>,
    ) -> Result<(), GridlockError> {
        let key = self.bound_room(conn, room).await?;
        let shared = self.live_room(&key).await?;
        let mut room = lock_live(&shared, &key).await?;

        if room.seat_of(conn).is_none() {
            return Err(RoomError::NotInRoom(conn, key).into());
        }
        room.reset();
        self.broadcast_restart(&room);
        Ok(())
    }

    // -- Leave / disconnect -------------------------------------------------

    /// Removes `conn` from its room at its own request.
    pub async fn leave(
        &self,
        conn: ConnectionId,
        room: Option<RoomKey>,
    ) -> Result<(), GridlockError> {
        let key = self.bound_room(conn, room).await?;
        self.depart(conn, &key, Exit::Left).await
    }

    /// Cleans up after `conn`'s transport is gone. A no-op for connections
    /// that never joined.
    pub async fn disconnect(&self, conn: ConnectionId) {
        let Some(key) = self.sessions.lookup(conn).await else {
            return;
        };
        if let Err(err) = self.depart(conn, &key, Exit::Disconnected).await {
            tracing::debug!(%conn, room = %key, error = %err, "disconnect cleanup");
        }
    }

    async fn depart(
        &self,
        conn: ConnectionId,
        key: &RoomKey,
        exit: Exit,
    ) -> Result<(), GridlockError> {
        self.sessions.unbind(conn).await;
        self.outbox.exit(key, conn);

        let Some(shared) = self.registry.get(key).await else {
            return Ok(());
        };

        let departure = {
            let mut room = lock_live(&shared, key).await?;
            let departure = match exit {
                Exit::Left => room.leave(conn)?,
                Exit::Disconnected => room.disconnect(conn)?,
            };
            self.announce_departure(key, departure, exit);
            departure
        };
        if !departure.room_empty {
            return Ok(());
        }

        // The registry stays locked until `removed` drops, so nobody can
        // join a successor room under this key while its group is torn down.
        let Some(removed) = self.registry.take_if_empty(key).await else {
            return Ok(());
        };
        self.outbox.broadcast(key, ServerMessage::RoomClosed { room: key.clone() });
        self.outbox.dissolve(key);
        for spectator in removed.spectators() {
            self.sessions.unbind_from(*spectator, key).await;
        }
        Ok(())
    }

    fn announce_departure(&self, key: &RoomKey, departure: Departure, exit: Exit) {
        let (Some(mark), Some(opponent)) = (departure.seat, departure.opponent) else {
            return;
        };
        let notice = match exit {
            Exit::Left => ServerMessage::OpponentLeft { room: key.clone(), mark },
            Exit::Disconnected => ServerMessage::OpponentDisconnected { room: key.clone(), mark },
        };
        self.outbox.broadcast(key, notice);
        self.outbox.send(opponent, ServerMessage::Waiting { room: key.clone() });
    }

    // -- Helpers ------------------------------------------------------------

    /// The room an intent targets: the bound room, which an explicit key
    /// must match.
    async fn bound_room(
        &self,
        conn: ConnectionId,
        requested: Option<RoomKey>,
    ) -> Result<RoomKey, GridlockError> {
        match (self.sessions.lookup(conn).await, requested) {
            (Some(bound), None) => Ok(bound),
            (Some(bound), Some(requested)) if bound == requested => Ok(bound),
            (_, requested) => {
                Err(RoomError::NotInRoom(conn, requested.unwrap_or_default()).into())
            }
        }
    }

    async fn live_room(&self, key: &RoomKey) -> Result<SharedRoom, GridlockError> {
        self.registry
            .get(key)
            .await
            .ok_or_else(|| RoomError::RoomNotFound(key.clone()).into())
    }

    fn send_error(&self, conn: ConnectionId, code: ErrorCode, message: String) {
        self.outbox.send(conn, ServerMessage::Error { code, message });
    }
}

/// Locks a room fetched from the registry, treating a retired room as gone.
async fn lock_live<'a>(
    shared: &'a SharedRoom,
    key: &RoomKey,
) -> Result<MutexGuard<'a, Room>, GridlockError> {
    let room = shared.lock().await;
    if room.is_retired() {
        return Err(RoomError::RoomNotFound(key.clone()).into());
    }
    Ok(room)
}
