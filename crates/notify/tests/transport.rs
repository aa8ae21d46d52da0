//! Integration tests for the notification transport, run against a local
//! WebSocket server.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::WsTestServer;
use ladle_notify::{
    start_health_check, NotificationTransport, ReconnectPolicy, TransportConfig,
};
use tokio::sync::mpsc;

/// Transport config with millisecond timings and a token taken from the
/// given (test-unique) environment variable.
fn test_config(ws_url: String, token_var: &str) -> TransportConfig {
    std::env::set_var(token_var, "test-token");
    let mut config = TransportConfig::new(ws_url);
    config.auth_token_env = token_var.into();
    config.connect_timeout = Duration::from_millis(500);
    // Larger than the window, so one manual connect makes exactly one
    // handshake attempt and attempt counting stays deterministic.
    config.connect_retry_interval = Duration::from_millis(600);
    config.reconnect = ReconnectPolicy {
        delay: Duration::from_millis(25),
        max_attempts: 3,
    };
    config.health_check_interval = Duration::from_secs(60);
    config
}

async fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}

// ---------------------------------------------------------------------------
// Test: connect is idempotent and subscribes exactly once
// ---------------------------------------------------------------------------

#[tokio::test]
async fn connect_is_idempotent_and_subscribes_once() {
    let server = WsTestServer::start(1).await;
    let transport =
        NotificationTransport::new(test_config(server.ws_url(), "LADLE_TOKEN_IDEMPOTENT"));

    assert!(transport.connect().await);
    assert!(transport.connect().await, "second connect must also report true");
    assert!(transport.is_connected());

    wait_until("both subscriptions", || server.subscriptions().len() == 2).await;
    assert_eq!(
        server.subscriptions(),
        vec!["/topic/notifications", "/user/queue/notifications"],
    );
    assert_eq!(server.accepted_count(), 1, "no duplicate connection");

    transport.disconnect();
}

// ---------------------------------------------------------------------------
// Test: missing credential fails fast without touching the network
// ---------------------------------------------------------------------------

#[tokio::test]
async fn connect_without_credential_touches_nothing() {
    let server = WsTestServer::start(1).await;
    let mut config = test_config(server.ws_url(), "LADLE_TOKEN_ABSENT");
    std::env::remove_var("LADLE_TOKEN_ABSENT");
    config.auth_token_env = "LADLE_TOKEN_ABSENT".into();

    let transport = NotificationTransport::new(config);
    assert!(!transport.connect().await);
    assert_eq!(server.accepted_count(), 0);
}

// ---------------------------------------------------------------------------
// Test: a panicking callback never blocks later callbacks
// ---------------------------------------------------------------------------

#[tokio::test]
async fn panicking_callback_does_not_block_delivery() {
    let server = WsTestServer::start(1).await;
    let transport = NotificationTransport::new(test_config(server.ws_url(), "LADLE_TOKEN_FANOUT"));

    transport.register_callback(|_| panic!("first listener always panics"));
    let (tx, mut rx) = mpsc::unbounded_channel();
    transport.register_callback(move |event| {
        let _ = tx.send(event.id);
    });

    assert!(transport.connect().await);
    server.push(r#"{"id":"n1","readStatus":false,"dismissed":false}"#);
    server.push(r#"{"id":"n2","readStatus":true,"dismissed":false}"#);

    let first = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("delivery timed out")
        .unwrap();
    let second = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("delivery timed out")
        .unwrap();
    assert_eq!(first, "n1");
    assert_eq!(second, "n2");

    transport.disconnect();
}

// ---------------------------------------------------------------------------
// Test: malformed frames are dropped, valid ones still flow
// ---------------------------------------------------------------------------

#[tokio::test]
async fn malformed_frames_are_dropped_without_killing_the_stream() {
    let server = WsTestServer::start(1).await;
    let transport =
        NotificationTransport::new(test_config(server.ws_url(), "LADLE_TOKEN_MALFORMED"));

    let (tx, mut rx) = mpsc::unbounded_channel();
    transport.register_callback(move |event| {
        let _ = tx.send(event.id);
    });

    assert!(transport.connect().await);
    server.push("not json at all");
    server.push(r#"{"title":"missing id"}"#);
    server.push(r#"{"id":"   "}"#);
    server.push(r#"{"id":"ok-1"}"#);

    let delivered = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("delivery timed out")
        .unwrap();
    assert_eq!(delivered, "ok-1", "only the well-formed frame is forwarded");
    assert!(rx.try_recv().is_err(), "malformed frames must not be forwarded");
    assert!(transport.is_connected(), "malformed frames must not drop the stream");

    transport.disconnect();
}

// ---------------------------------------------------------------------------
// Test: bounded retry: after the budget, no automatic attempt happens
// until a manual connect resets it
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reconnect_attempts_are_bounded_until_manual_connect() {
    let server = WsTestServer::start(1).await;
    let transport =
        NotificationTransport::new(test_config(server.ws_url(), "LADLE_TOKEN_BOUNDED"));

    assert!(transport.connect().await);
    assert_eq!(server.accepted_count(), 1);

    server.close_client();

    // The full budget: three automatic attempts, all failing handshakes.
    wait_until("the automatic attempts", || server.accepted_count() == 4).await;

    // Give it room to (incorrectly) try a fourth automatic attempt.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(server.accepted_count(), 4, "no attempt beyond the budget");
    assert!(!transport.is_connected());

    // A manual connect resets the budget and makes a fresh attempt.
    assert!(!transport.connect().await);
    assert_eq!(server.accepted_count(), 5);
}

// ---------------------------------------------------------------------------
// Test: the periodic health check restores a dropped connection while the
// error-driven loop is still sleeping
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_check_restores_a_dropped_connection() {
    let server = WsTestServer::start(2).await;
    let mut config = test_config(server.ws_url(), "LADLE_TOKEN_HEALTH");
    // Park the error-driven loop so only the health check can reconnect.
    config.reconnect = ReconnectPolicy {
        delay: Duration::from_secs(30),
        max_attempts: 5,
    };
    config.health_check_interval = Duration::from_millis(50);

    let transport = NotificationTransport::new(config);
    assert!(transport.connect().await);

    let health = start_health_check(Arc::clone(&transport));
    server.close_client();

    wait_until("the health-check reconnect", || {
        transport.is_connected() && server.accepted_count() == 2
    })
    .await;

    health.abort();
    transport.disconnect();
}

// ---------------------------------------------------------------------------
// Test: disconnect stops the reader and schedules nothing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn disconnect_stops_automatic_reconnection() {
    let server = WsTestServer::start(1).await;
    let transport =
        NotificationTransport::new(test_config(server.ws_url(), "LADLE_TOKEN_DISCONNECT"));

    assert!(transport.connect().await);
    transport.disconnect();

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(server.accepted_count(), 1, "no reconnect after manual disconnect");
    assert!(!transport.is_connected());
}
