//! Per-connection handler: greeting, intent loop, and cleanup.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Register an outbound queue and send `Welcome`
//!   2. Spawn a writer task that drains the queue onto the socket
//!   3. Loop: receive frames → decode → hand to the coordinator
//!   4. On exit, the drop guard runs the coordinator's disconnect path

use std::sync::Arc;
use std::time::Duration;

use gridlock_protocol::{
    ClientMessage, Codec, ConnectionId, ErrorCode, PROTOCOL_VERSION, ServerMessage,
};
use gridlock_transport::{Connection, TransportError, WebSocketConnection};

use crate::hub::OutboundReceiver;
use crate::server::ServerState;
use crate::{ConnectionHub, GameCoordinator, GridlockError, Outbox};

/// Drop guard that removes a connection from the game when the handler
/// exits, including by panic.
///
/// `Drop` is synchronous, so the async cleanup runs on a spawned task.
struct DisconnectGuard {
    conn_id: ConnectionId,
    coordinator: GameCoordinator<ConnectionHub>,
    hub: Arc<ConnectionHub>,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let coordinator = self.coordinator.clone();
        let hub = Arc::clone(&self.hub);
        tokio::spawn(async move {
            coordinator.disconnect(conn_id).await;
            hub.unregister(conn_id);
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), GridlockError>
where
    C: Codec + Clone,
{
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let outbound = state.hub.register(conn_id);
    let _guard = DisconnectGuard {
        conn_id,
        coordinator: state.coordinator.clone(),
        hub: Arc::clone(&state.hub),
    };

    state.hub.send(
        conn_id,
        ServerMessage::Welcome {
            connection: conn_id.into_inner(),
            version: PROTOCOL_VERSION,
        },
    );

    let writer = tokio::spawn(write_loop(
        Arc::clone(&conn),
        outbound,
        state.codec.clone(),
    ));

    loop {
        let data = match recv_within(conn.as_ref(), state.idle_timeout).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::info!(%conn_id, "connection closed cleanly");
                break;
            }
            Ok(Err(e)) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
            Err(_) => {
                tracing::info!(%conn_id, "connection timed out");
                break;
            }
        };

        let msg: ClientMessage = match state.codec.decode(&data) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "failed to decode intent");
                send_error(
                    state.hub.as_ref(),
                    conn_id,
                    ErrorCode::InvalidIntent,
                    &format!("invalid message: {e}"),
                );
                continue;
            }
        };

        state.coordinator.handle(conn_id, msg).await;
    }

    writer.abort();
    let _ = conn.close().await;

    // _guard drops here → disconnect fires.
    Ok(())
}

/// Receives the next frame, giving up after `idle` if set.
async fn recv_within(
    conn: &WebSocketConnection,
    idle: Option<Duration>,
) -> Result<Result<Option<Vec<u8>>, TransportError>, tokio::time::error::Elapsed> {
    match idle {
        Some(limit) => tokio::time::timeout(limit, conn.recv()).await,
        None => Ok(conn.recv().await),
    }
}

/// Drains `outbound` onto the socket until the queue closes or a send fails.
async fn write_loop<C: Codec>(
    conn: Arc<WebSocketConnection>,
    mut outbound: OutboundReceiver,
    codec: C,
) {
    let conn_id = conn.id();
    while let Some(msg) = outbound.recv().await {
        let bytes = match codec.encode(&msg) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(%conn_id, error = %e, "failed to encode message");
                continue;
            }
        };
        if let Err(e) = conn.send(&bytes).await {
            tracing::debug!(%conn_id, error = %e, "send failed, ending writer");
            break;
        }
    }
}

/// Queues a `ServerMessage::Error` for the client.
fn send_error(outbox: &impl Outbox, conn_id: ConnectionId, code: ErrorCode, message: &str) {
    outbox.send(
        conn_id,
        ServerMessage::Error {
            code,
            message: message.to_string(),
        },
    );
}
