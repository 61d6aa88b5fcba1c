//! The room state machine: one game's board, seats, turn, and status.
//!
//! A `Room` is a plain synchronous value. Serialization of concurrent
//! access is the registry's job (each room lives behind its own mutex), so
//! every method here runs start-to-finish without interleaving.

use std::sync::atomic::{AtomicU64, Ordering};

use gridlock_protocol::{ConnectionId, Mark, RoomId, RoomKey, RoomStatus, Winner};

use crate::{Board, Outcome, RoomConfig, RoomError};

/// Counter for generating unique room instance IDs.
static NEXT_ROOM_ID: AtomicU64 = AtomicU64::new(1);

/// What a successful join did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The connection took a free seat. `started` is `true` when this join
    /// filled the second seat and a round began.
    Seated { mark: Mark, started: bool },
    /// The connection already held this seat; nothing changed.
    Rejoined { mark: Mark },
    /// Both seats are taken; the connection watches read-only.
    Spectating,
}

/// What an accepted move did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The game goes on; `next_turn` is now to move.
    Accepted {
        position: usize,
        mark: Mark,
        next_turn: Mark,
    },
    /// The move ended the game. `line` is set for a win, `None` for a draw.
    GameOver {
        position: usize,
        mark: Mark,
        winner: Winner,
        line: Option<[usize; 3]>,
    },
}

/// Who left and who is still there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Departure {
    /// The seat that was vacated, or `None` for a spectator.
    pub seat: Option<Mark>,
    /// The connection in the other seat, if any.
    pub opponent: Option<ConnectionId>,
    /// `true` when both seats are now vacant and the room can be destroyed.
    pub room_empty: bool,
}

/// One game session.
#[derive(Debug)]
pub struct Room {
    id: RoomId,
    key: RoomKey,
    config: RoomConfig,
    board: Board,
    /// Indexed by [`Mark::index`].
    seats: [Option<ConnectionId>; 2],
    /// In join order.
    spectators: Vec<ConnectionId>,
    turn: Mark,
    status: RoomStatus,
    /// Bumped on every reset, so deferred work can tell rounds apart.
    round: u64,
    /// Set once the registry has dropped this room.
    retired: bool,
}

impl Room {
    /// Creates an empty room waiting for its first player.
    pub fn new(key: RoomKey, config: RoomConfig) -> Self {
        Self {
            id: RoomId(NEXT_ROOM_ID.fetch_add(1, Ordering::Relaxed)),
            key,
            config,
            board: Board::new(),
            seats: [None, None],
            spectators: Vec::new(),
            turn: Mark::X,
            status: RoomStatus::WaitingForOpponent,
            round: 0,
            retired: false,
        }
    }

    // -- Accessors ----------------------------------------------------------

    pub fn id(&self) -> RoomId {
        self.id
    }

    pub fn key(&self) -> &RoomKey {
        &self.key
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// The mark whose turn it is.
    pub fn turn(&self) -> Mark {
        self.turn
    }

    pub fn status(&self) -> RoomStatus {
        self.status
    }

    pub fn round(&self) -> u64 {
        self.round
    }

    /// The connection sitting in `mark`'s seat.
    pub fn seat(&self, mark: Mark) -> Option<ConnectionId> {
        self.seats[mark.index()]
    }

    /// The seat `conn` holds, if any.
    pub fn seat_of(&self, conn: ConnectionId) -> Option<Mark> {
        Mark::ALL
            .into_iter()
            .find(|mark| self.seats[mark.index()] == Some(conn))
    }

    pub fn is_spectator(&self, conn: ConnectionId) -> bool {
        self.spectators.contains(&conn)
    }

    /// Spectators in join order.
    pub fn spectators(&self) -> &[ConnectionId] {
        &self.spectators
    }

    pub fn spectator_count(&self) -> usize {
        self.spectators.len()
    }

    /// `true` when both seats are vacant. Spectators do not count.
    pub fn is_empty(&self) -> bool {
        self.seats.iter().all(Option::is_none)
    }

    fn both_seated(&self) -> bool {
        self.seats.iter().all(Option::is_some)
    }

    /// `true` once the registry has removed this room. A retired room must
    /// not be joined; the caller looks the key up again instead.
    pub fn is_retired(&self) -> bool {
        self.retired
    }

    pub(crate) fn retire(&mut self) {
        self.retired = true;
    }

    // -- Operations ---------------------------------------------------------

    /// Seats `conn`, or makes it a spectator when both seats are taken.
    ///
    /// Joining again with a seat already held is idempotent. A spectator
    /// that joins again while a seat is free takes that seat.
    pub fn join(&mut self, conn: ConnectionId) -> Result<JoinOutcome, RoomError> {
        if let Some(mark) = self.seat_of(conn) {
            tracing::debug!(room = %self.key, %conn, %mark, "seat re-joined");
            return Ok(JoinOutcome::Rejoined { mark });
        }

        let free = Mark::ALL
            .into_iter()
            .find(|mark| self.seats[mark.index()].is_none());

        let Some(mark) = free else {
            if self.is_spectator(conn) {
                return Ok(JoinOutcome::Spectating);
            }
            if !self.config.admits_spectator(self.spectators.len()) {
                return Err(RoomError::RoomFull(self.key.clone()));
            }
            self.spectators.push(conn);
            tracing::info!(
                room = %self.key,
                %conn,
                spectators = self.spectators.len(),
                "spectator joined"
            );
            return Ok(JoinOutcome::Spectating);
        };

        self.spectators.retain(|s| *s != conn);
        self.seats[mark.index()] = Some(conn);
        tracing::info!(room = %self.key, %conn, %mark, "player seated");

        let started = self.both_seated();
        if started {
            self.start_round();
            tracing::info!(room = %self.key, round = self.round, "game started");
        } else {
            self.status = RoomStatus::WaitingForOpponent;
        }
        Ok(JoinOutcome::Seated { mark, started })
    }

    /// Plays a move for `conn`.
    ///
    /// Checks run in a fixed order: room status, then seat ownership and
    /// turn, then the board. The mark written is always the one of the
    /// seat `conn` owns; `claimed` is only compared against it.
    pub fn make_move(
        &mut self,
        conn: ConnectionId,
        position: usize,
        claimed: Option<Mark>,
    ) -> Result<MoveOutcome, RoomError> {
        if self.status != RoomStatus::InProgress {
            return Err(RoomError::NotInProgress(self.status));
        }

        let mark = self.seat_of(conn).ok_or(RoomError::NotYourTurn)?;
        if mark != self.turn || claimed.is_some_and(|c| c != mark) {
            return Err(RoomError::NotYourTurn);
        }

        self.board.apply(position, mark)?;

        let outcome = match self.board.evaluate() {
            Outcome::InProgress => {
                self.turn = mark.opponent();
                return Ok(MoveOutcome::Accepted {
                    position,
                    mark,
                    next_turn: self.turn,
                });
            }
            Outcome::Win { mark: winner, line } => MoveOutcome::GameOver {
                position,
                mark,
                winner: winner.into(),
                line: Some(line),
            },
            Outcome::Draw => MoveOutcome::GameOver {
                position,
                mark,
                winner: Winner::Draw,
                line: None,
            },
        };

        self.status = RoomStatus::Finished;
        tracing::info!(room = %self.key, round = self.round, ?outcome, "game finished");
        Ok(outcome)
    }

    /// Clears the board for a new round. Callable in any state.
    ///
    /// Seats are kept. The room is `InProgress` again if both are filled,
    /// `WaitingForOpponent` otherwise.
    pub fn reset(&mut self) {
        if self.both_seated() {
            self.start_round();
        } else {
            self.clear_round();
            self.status = RoomStatus::WaitingForOpponent;
        }
        tracing::info!(room = %self.key, round = self.round, status = %self.status, "room reset");
    }

    /// Applies a deferred reset scheduled for `round`.
    ///
    /// Does nothing unless the room is still `Finished` on that same round,
    /// i.e. nobody has reset it in the meantime. Returns whether it reset.
    pub fn reset_finished_round(&mut self, round: u64) -> bool {
        if self.status != RoomStatus::Finished || self.round != round {
            tracing::debug!(
                room = %self.key,
                scheduled = round,
                current = self.round,
                status = %self.status,
                "stale scheduled reset skipped"
            );
            return false;
        }
        self.reset();
        true
    }

    /// Removes `conn` after an explicit leave.
    pub fn leave(&mut self, conn: ConnectionId) -> Result<Departure, RoomError> {
        let departure = self.vacate(conn)?;
        tracing::info!(room = %self.key, %conn, seat = ?departure.seat, "left room");
        Ok(departure)
    }

    /// Removes `conn` after its transport dropped.
    pub fn disconnect(&mut self, conn: ConnectionId) -> Result<Departure, RoomError> {
        let departure = self.vacate(conn)?;
        tracing::info!(room = %self.key, %conn, seat = ?departure.seat, "disconnected from room");
        Ok(departure)
    }

    fn vacate(&mut self, conn: ConnectionId) -> Result<Departure, RoomError> {
        let Some(mark) = self.seat_of(conn) else {
            let before = self.spectators.len();
            self.spectators.retain(|s| *s != conn);
            if self.spectators.len() == before {
                return Err(RoomError::NotInRoom(conn, self.key.clone()));
            }
            return Ok(Departure {
                seat: None,
                opponent: self.seat(Mark::X).or(self.seat(Mark::O)),
                room_empty: self.is_empty(),
            });
        };

        self.seats[mark.index()] = None;
        // The round cannot continue with one seat empty.
        self.clear_round();
        self.status = RoomStatus::WaitingForOpponent;

        Ok(Departure {
            seat: Some(mark),
            opponent: self.seat(mark.opponent()),
            room_empty: self.is_empty(),
        })
    }

    fn start_round(&mut self) {
        self.clear_round();
        self.status = RoomStatus::InProgress;
    }

    fn clear_round(&mut self) {
        self.board.reset();
        self.turn = Mark::X;
        self.round += 1;
    }
}
