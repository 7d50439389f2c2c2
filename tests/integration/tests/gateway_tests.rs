//! Gateway Integration Tests
//!
//! Run a gateway with in-memory backends and drive it over real WebSocket
//! and HTTP connections.
//!
//! Run with: cargo test -p integration-tests --test gateway_tests

use std::time::Duration;

use integration_tests::{eventually, TestServer};
use relay_common::{DuplicateLoginPolicy, RelayConfig};
use reqwest::StatusCode;
use serde_json::{json, Value};

// ============================================================================
// Direct messages and offline delivery
// ============================================================================

#[tokio::test]
async fn test_offline_message_delivered_on_resume() {
    let server = TestServer::start().await.unwrap();
    let mut u1 = server.connect("u1").await.unwrap();

    u1.send_acked(json!({"event": "chat", "receiver_id": "u2", "data": "hi"}), "c1")
        .await
        .unwrap();

    let mut u2 = server.connect_resume("u2").await.unwrap();
    let frame = u2.recv_json().await.unwrap();
    assert_eq!(frame["event"], "chat");
    assert_eq!(frame["data"], "hi");
    assert_eq!(frame["sender_id"], "u1");
    assert!(frame.get("ack").is_none());

    // Queue was cleared by the drain
    u2.close().await.unwrap();
    server.wait_offline("u2").await.unwrap();
    let mut u2 = server.connect_resume("u2").await.unwrap();
    u2.expect_silence(Duration::from_millis(200)).await.unwrap();
}

#[tokio::test]
async fn test_connect_without_resume_leaves_queue() {
    let server = TestServer::start().await.unwrap();
    let mut u1 = server.connect("u1").await.unwrap();
    u1.send_acked(json!({"event": "chat", "receiver_id": "u2", "data": 1}), "c1")
        .await
        .unwrap();

    let mut u2 = server.connect("u2").await.unwrap();
    u2.expect_silence(Duration::from_millis(200)).await.unwrap();
    u2.close().await.unwrap();
    server.wait_offline("u2").await.unwrap();

    let mut u2 = server.connect_resume("u2").await.unwrap();
    assert_eq!(u2.recv_json().await.unwrap()["data"], 1);
}

#[tokio::test]
async fn test_direct_message_with_receiver_ack() {
    let server = TestServer::start().await.unwrap();
    let mut u1 = server.connect("u1").await.unwrap();
    let mut u2 = server.connect("u2").await.unwrap();

    u1.send_acked(json!({"event": "chat", "receiver_id": "u2", "data": "ping"}), "c1")
        .await
        .unwrap();

    let frame = u2.recv_json().await.unwrap();
    assert_eq!(frame["data"], "ping");
    assert_eq!(frame["ack"], true);
    let ack_id = frame["ack_id"].as_str().unwrap().to_string();
    assert_ne!(ack_id, "c1");

    let acks = server.state.router().acks().clone();
    assert_eq!(acks.pending_count(), 1);

    u2.send_json(json!({"event": "__ack__", "ack_id": ack_id}))
        .await
        .unwrap();
    eventually(move || acks.pending_count() == 0).await.unwrap();
}

#[tokio::test]
async fn test_malformed_frame_keeps_connection_open() {
    let server = TestServer::start().await.unwrap();
    let mut u1 = server.connect("u1").await.unwrap();

    u1.send_json(json!({"event": "", "data": 1})).await.unwrap();
    u1.send_json(json!(["not", "a", "frame"])).await.unwrap();

    u1.send_acked(json!({"event": "noop"}), "still-here")
        .await
        .unwrap();
    assert!(server.is_online("u1"));
}

// ============================================================================
// Rooms and broadcast
// ============================================================================

#[tokio::test]
async fn test_room_fan_out() {
    let server = TestServer::start().await.unwrap();
    let mut u1 = server.connect("u1").await.unwrap();
    let mut u2 = server.connect("u2").await.unwrap();
    let mut u3 = server.connect("u3").await.unwrap();

    u1.send_acked(json!({"event": "join", "room_id": "r"}), "j1")
        .await
        .unwrap();
    u2.send_acked(json!({"event": "join", "room_id": "r"}), "j2")
        .await
        .unwrap();

    u1.send_json(json!({"event": "chat", "room_id": "r", "data": "hello room"}))
        .await
        .unwrap();

    let frame = u2.recv_json().await.unwrap();
    assert_eq!(frame["room_id"], "r");
    assert_eq!(frame["data"], "hello room");
    u1.expect_silence(Duration::from_millis(200)).await.unwrap();
    u3.expect_silence(Duration::from_millis(200)).await.unwrap();

    u2.send_acked(json!({"event": "leave", "room_id": "r"}), "l2")
        .await
        .unwrap();
    assert_eq!(server.state.router().rooms().members("r").len(), 1);
}

#[tokio::test]
async fn test_room_create_conflict_answers_with_error() {
    let server = TestServer::start().await.unwrap();
    let mut u1 = server.connect("u1").await.unwrap();

    u1.send_acked(json!({"event": "room.create", "room_id": "lobby"}), "c1")
        .await
        .unwrap();

    u1.send_json(json!({"event": "room.create", "room_id": "lobby"}))
        .await
        .unwrap();
    let frame = u1.recv_json().await.unwrap();
    assert_eq!(frame["event"], "error");
    assert_eq!(frame["data"]["message"], "room already exists");
    assert!(server.is_online("u1"));
}

#[tokio::test]
async fn test_broadcast_reaches_everyone_else() {
    let server = TestServer::start().await.unwrap();
    let mut u1 = server.connect("u1").await.unwrap();
    let mut u2 = server.connect("u2").await.unwrap();
    let mut u3 = server.connect("u3").await.unwrap();

    u1.send_json(json!({"event": "broadcast", "data": "all"}))
        .await
        .unwrap();

    assert_eq!(u2.recv_json().await.unwrap()["data"], "all");
    assert_eq!(u3.recv_json().await.unwrap()["data"], "all");
    u1.expect_silence(Duration::from_millis(200)).await.unwrap();
}

// ============================================================================
// Connection lifecycle
// ============================================================================

#[tokio::test]
async fn test_missing_credentials_rejected_before_upgrade() {
    let server = TestServer::start().await.unwrap();
    let url = format!("ws://{}/ws", server.addr);

    let result = server.connect_raw(&url).await;
    let err = result.err().unwrap();
    let ws_err = err
        .downcast_ref::<tokio_tungstenite::tungstenite::Error>()
        .unwrap();
    match ws_err {
        tokio_tungstenite::tungstenite::Error::Http(response) => {
            assert_eq!(response.status().as_u16(), 401);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_duplicate_login_replaces_previous_connection() {
    let server = TestServer::start().await.unwrap();
    let mut first = server.connect("u1").await.unwrap();
    let mut second = server.connect("u1").await.unwrap();

    assert_eq!(first.recv_close().await.unwrap(), Some(4002));
    assert!(server.is_online("u1"));

    second
        .send_acked(json!({"event": "noop"}), "after-replace")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_duplicate_login_rejected_under_reject_policy() {
    let server = TestServer::start_with(RelayConfig {
        duplicate_login: DuplicateLoginPolicy::Reject,
        ..RelayConfig::default()
    })
    .await
    .unwrap();
    let mut first = server.connect("u1").await.unwrap();

    let mut second = server
        .connect_raw(&server.ws_url("u1", false))
        .await
        .unwrap();
    assert_eq!(second.recv_close().await.unwrap(), Some(4003));

    first
        .send_acked(json!({"event": "noop"}), "still-first")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_silent_client_times_out() {
    let server = TestServer::start_with(RelayConfig {
        heartbeat_interval_ms: 100,
        heartbeat_timeout_multiplier: 2,
        ..RelayConfig::default()
    })
    .await
    .unwrap();
    let mut u1 = server.connect("u1").await.unwrap();

    // Not reading means no pong is sent back
    tokio::time::sleep(Duration::from_millis(600)).await;

    assert_eq!(u1.recv_close().await.unwrap(), Some(4001));
    server.wait_offline("u1").await.unwrap();
}

#[tokio::test]
async fn test_responsive_client_stays_connected() {
    let server = TestServer::start_with(RelayConfig {
        heartbeat_interval_ms: 100,
        heartbeat_timeout_multiplier: 2,
        ..RelayConfig::default()
    })
    .await
    .unwrap();
    let mut u1 = server.connect("u1").await.unwrap();

    // Reading answers pings automatically
    u1.expect_silence(Duration::from_millis(600)).await.unwrap();
    assert!(server.is_online("u1"));
}

#[tokio::test]
async fn test_client_close_removes_connection() {
    let server = TestServer::start().await.unwrap();
    let u1 = server.connect("u1").await.unwrap();

    u1.close().await.unwrap();
    server.wait_offline("u1").await.unwrap();
}

// ============================================================================
// Admin surface
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::start().await.unwrap();
    let response = server.get("/health").await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_online_users() {
    let server = TestServer::start().await.unwrap();
    let _u2 = server.connect("u2").await.unwrap();
    let _u1 = server.connect("u1").await.unwrap();

    let body: Value = server.get("/online").await.unwrap().json().await.unwrap();
    assert_eq!(body, json!({"online_users": ["u1", "u2"]}));
}

#[tokio::test]
async fn test_admin_send_routes_through_registry() {
    let server = TestServer::start().await.unwrap();
    let mut u1 = server.connect("u1").await.unwrap();

    let raw = json!({"event": "notice", "data": "maintenance"}).to_string();
    let response = server
        .post("/send", &json!({"user_id": "u1", "message": raw}))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.json::<Value>().await.unwrap(), json!({"status": "sent"}));

    let frame = u1.recv_json().await.unwrap();
    assert_eq!(frame["event"], "notice");

    let response = server
        .post("/send", &json!({"user_id": "ghost", "message": "x"}))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], "NOT_CONNECTED");
}

#[tokio::test]
async fn test_admin_close() {
    let server = TestServer::start().await.unwrap();
    let mut u1 = server.connect("u1").await.unwrap();

    let response = server
        .post("/close", &json!({"user_id": "u1"}))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(u1.recv_close().await.unwrap(), Some(4005));
    server.wait_offline("u1").await.unwrap();

    let response = server
        .post("/close", &json!({"user_id": "u1"}))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
