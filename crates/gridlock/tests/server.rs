//! Integration tests for the Gridlock server, handler, and full connection flow.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use gridlock::prelude::*;
use serde_json::json;
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

const RESET_DELAY: Duration = Duration::from_millis(150);

/// Starts a server on a random port and returns the address and a handle
/// to its coordinator.
async fn start_server() -> (String, GameCoordinator<ConnectionHub>) {
    let server = GameServer::builder()
        .bind("127.0.0.1:0")
        .reset_delay(RESET_DELAY)
        .build()
        .await
        .expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();
    let coordinator = server.coordinator();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    // Give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(10)).await;
    (addr, coordinator)
}

/// Connects and consumes the `welcome` greeting.
async fn connect(addr: &str) -> ClientWs {
    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    match recv(&mut ws).await {
        ServerMessage::Welcome { version, .. } => assert_eq!(version, PROTOCOL_VERSION),
        other => panic!("expected Welcome, got {other:?}"),
    }
    ws
}

async fn send(ws: &mut ClientWs, value: serde_json::Value) {
    ws.send(Message::Text(value.to_string().into()))
        .await
        .expect("send");
}

/// Next game message, skipping control frames.
async fn recv(ws: &mut ClientWs) -> ServerMessage {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("timed out waiting for a message")
            .expect("stream ended")
            .expect("websocket error");
        if msg.is_text() || msg.is_binary() {
            return serde_json::from_slice(&msg.into_data()).expect("decode");
        }
    }
}

/// Reads until a message matches `pred`, returning it.
async fn recv_until(ws: &mut ClientWs, pred: impl Fn(&ServerMessage) -> bool) -> ServerMessage {
    loop {
        let msg = recv(ws).await;
        if pred(&msg) {
            return msg;
        }
    }
}

/// Connects two clients and seats them in `room`, past the `game_start`.
async fn pair(addr: &str, room: &str) -> (ClientWs, ClientWs) {
    let mut x = connect(addr).await;
    let mut o = connect(addr).await;

    send(&mut x, json!({"type": "join", "room": room})).await;
    assert_eq!(
        recv(&mut x).await,
        ServerMessage::Joined { room: RoomKey::from(room), mark: Mark::X }
    );
    assert_eq!(recv(&mut x).await, ServerMessage::Waiting { room: RoomKey::from(room) });

    send(&mut o, json!({"type": "join", "room": room})).await;
    assert_eq!(
        recv(&mut o).await,
        ServerMessage::Joined { room: RoomKey::from(room), mark: Mark::O }
    );
    assert!(matches!(recv(&mut o).await, ServerMessage::GameStart { mark: Mark::O, .. }));
    assert!(matches!(recv(&mut x).await, ServerMessage::GameStart { mark: Mark::X, .. }));

    (x, o)
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_welcome_on_connect() {
    let (addr, _) = start_server().await;
    let _ws = connect(&addr).await;
}

#[tokio::test]
async fn test_full_game_over_websocket() {
    let (addr, _) = start_server().await;
    let (mut x, mut o) = pair(&addr, "room1").await;

    for (mover, position) in [(0, 0), (1, 4), (0, 1), (1, 5)] {
        let ws = if mover == 0 { &mut x } else { &mut o };
        send(ws, json!({"type": "move", "position": position})).await;
        for ws in [&mut x, &mut o] {
            match recv(ws).await {
                ServerMessage::MoveAccepted { position: p, .. } => assert_eq!(p, position),
                other => panic!("expected MoveAccepted, got {other:?}"),
            }
        }
    }

    send(&mut x, json!({"type": "move", "position": 2})).await;
    for ws in [&mut x, &mut o] {
        match recv(ws).await {
            ServerMessage::GameOver { winner, winning_line, winning_cells, board, .. } => {
                assert_eq!(winner, Winner::X);
                assert_eq!(winning_line, Some([0, 1, 2]));
                assert_eq!(winning_cells, Some([[0, 0], [0, 1], [0, 2]]));
                assert_eq!(board[2], Cell::X);
            }
            other => panic!("expected GameOver, got {other:?}"),
        }
    }

    send(&mut o, json!({"type": "move", "position": 8})).await;
    match recv(&mut o).await {
        ServerMessage::Error { code, .. } => assert_eq!(code, ErrorCode::NotInProgress),
        other => panic!("expected Error, got {other:?}"),
    }

    for ws in [&mut x, &mut o] {
        assert_eq!(
            recv(ws).await,
            ServerMessage::GameRestarted {
                room: RoomKey::from("room1"),
                board: [Cell::Empty; 9],
                turn: Mark::X,
            }
        );
    }
}

#[tokio::test]
async fn test_legacy_event_names() {
    let (addr, _) = start_server().await;
    let mut x = connect(&addr).await;
    let mut o = connect(&addr).await;

    send(&mut x, json!({"type": "join_game", "gameId": "legacy"})).await;
    recv_until(&mut x, |m| matches!(m, ServerMessage::Waiting { .. })).await;
    send(&mut o, json!({"type": "join_game", "game_id": "legacy"})).await;
    recv_until(&mut x, |m| matches!(m, ServerMessage::GameStart { .. })).await;
    recv_until(&mut o, |m| matches!(m, ServerMessage::GameStart { .. })).await;

    send(&mut x, json!({"type": "make_move", "row": 2, "col": 0, "symbol": "X"})).await;
    match recv(&mut o).await {
        ServerMessage::MoveAccepted { position, row, col, .. } => {
            assert_eq!((position, row, col), (6, 2, 0));
        }
        other => panic!("expected MoveAccepted, got {other:?}"),
    }

    send(&mut o, json!({"type": "reset_game"})).await;
    assert!(matches!(recv(&mut x).await, ServerMessage::MoveAccepted { .. }));
    assert!(matches!(recv(&mut x).await, ServerMessage::GameRestarted { .. }));
}

#[tokio::test]
async fn test_malformed_frame_keeps_connection() {
    let (addr, _) = start_server().await;
    let mut ws = connect(&addr).await;

    ws.send(Message::Text("not json".into())).await.expect("send");
    match recv(&mut ws).await {
        ServerMessage::Error { code, .. } => assert_eq!(code, ErrorCode::InvalidIntent),
        other => panic!("expected Error, got {other:?}"),
    }

    send(&mut ws, json!({"type": "move"})).await;
    match recv(&mut ws).await {
        ServerMessage::Error { code, .. } => assert_eq!(code, ErrorCode::InvalidIntent),
        other => panic!("expected Error, got {other:?}"),
    }

    send(&mut ws, json!({"type": "heartbeat", "client_time": 7})).await;
    assert!(matches!(
        recv(&mut ws).await,
        ServerMessage::HeartbeatAck { client_time: 7, .. }
    ));
}

#[tokio::test]
async fn test_disconnect_notifies_opponent() {
    let (addr, coordinator) = start_server().await;
    let (x, mut o) = pair(&addr, "room1").await;

    drop(x);

    assert_eq!(
        recv(&mut o).await,
        ServerMessage::OpponentDisconnected { room: RoomKey::from("room1"), mark: Mark::X }
    );
    assert_eq!(recv(&mut o).await, ServerMessage::Waiting { room: RoomKey::from("room1") });
    assert_eq!(coordinator.active_rooms().await, 1);
}

#[tokio::test]
async fn test_room_closes_after_both_leave() {
    let (addr, coordinator) = start_server().await;
    let (mut x, mut o) = pair(&addr, "room1").await;

    send(&mut x, json!({"type": "leave"})).await;
    recv_until(&mut o, |m| matches!(m, ServerMessage::OpponentLeft { .. })).await;
    send(&mut o, json!({"type": "leave"})).await;

    send(&mut o, json!({"type": "health"})).await;
    assert_eq!(
        recv_until(&mut o, |m| matches!(m, ServerMessage::Health { .. })).await,
        ServerMessage::Health { active_rooms: 0 }
    );
    assert_eq!(coordinator.active_rooms().await, 0);
}

#[tokio::test]
async fn test_third_client_spectates() {
    let (addr, _) = start_server().await;
    let (mut x, _o) = pair(&addr, "room1").await;
    let mut s = connect(&addr).await;

    send(&mut s, json!({"type": "join", "room": "room1"})).await;
    match recv(&mut s).await {
        ServerMessage::Spectating { status, turn, .. } => {
            assert_eq!(status, RoomStatus::InProgress);
            assert_eq!(turn, Mark::X);
        }
        other => panic!("expected Spectating, got {other:?}"),
    }

    send(&mut x, json!({"type": "move", "position": 4})).await;
    assert!(matches!(
        recv(&mut s).await,
        ServerMessage::MoveAccepted { position: 4, .. }
    ));
}
