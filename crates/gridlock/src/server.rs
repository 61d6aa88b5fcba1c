//! `GameServer` builder and accept loop.
//!
//! This is the entry point for running a Gridlock server. It ties together
//! all the layers: transport → protocol → coordinator → rooms.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use gridlock_protocol::{Codec, JsonCodec};
use gridlock_room::RoomConfig;
use gridlock_transport::{Transport, WebSocketTransport};

use crate::handler::handle_connection;
use crate::{ConnectionHub, GameCoordinator, GridlockError, ServerConfig};

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) coordinator: GameCoordinator<ConnectionHub>,
    pub(crate) hub: Arc<ConnectionHub>,
    pub(crate) codec: C,
    pub(crate) idle_timeout: Option<Duration>,
}

/// Builder for configuring and starting a Gridlock server.
///
/// # Example
///
/// ```rust,no_run
/// use gridlock::prelude::*;
/// use std::time::Duration;
///
/// # async fn start() -> Result<(), GridlockError> {
/// let server = GameServer::builder()
///     .bind("0.0.0.0:8080")
///     .reset_delay(Duration::from_secs(3))
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct GameServerBuilder {
    config: ServerConfig,
}

impl GameServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing configuration, e.g. [`ServerConfig::from_env`].
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets the delay between a game ending and its automatic reset.
    pub fn reset_delay(mut self, delay: Duration) -> Self {
        self.config.reset_delay = delay;
        self
    }

    /// Sets the per-connection idle limit. `None` disables it.
    pub fn idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    /// Sets the room configuration.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.config.room = config;
        self
    }

    /// Binds the listener and builds the server.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build(self) -> Result<GameServer<JsonCodec>, GridlockError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;

        let hub = Arc::new(ConnectionHub::new());
        let coordinator = GameCoordinator::new(
            Arc::clone(&hub),
            self.config.room.clone(),
            self.config.reset_delay,
        );
        let state = Arc::new(ServerState {
            coordinator,
            hub,
            codec: JsonCodec,
            idle_timeout: self.config.idle_timeout,
        });

        Ok(GameServer { transport, state })
    }
}

/// A bound Gridlock server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct GameServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl GameServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> GameServerBuilder {
        GameServerBuilder::new()
    }
}

impl<C: Codec + Clone> GameServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, GridlockError> {
        Ok(self.transport.local_addr()?)
    }

    /// A handle to the game state, usable after `run` has taken the server.
    pub fn coordinator(&self) -> GameCoordinator<ConnectionHub> {
        self.state.coordinator.clone()
    }

    /// Number of live rooms.
    pub async fn active_rooms(&self) -> usize {
        self.state.coordinator.active_rooms().await
    }

    /// Runs the accept loop.
    ///
    /// Spawns a handler task for each accepted connection. Runs until the
    /// process is terminated.
    pub async fn run(mut self) -> Result<(), GridlockError> {
        tracing::info!(addr = ?self.transport.local_addr().ok(), "Gridlock server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
