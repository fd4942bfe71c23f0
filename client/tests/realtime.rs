//! Change-feed behavior against a stub websocket backend: table routing,
//! server-side filters and channel teardown.

use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use ldhingram_client::{Config, RealtimeClient, SubscriptionError};
use ldhingram_model::EventType;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use uuid::Uuid;

type FrameLog = Arc<Mutex<Vec<serde_json::Value>>>;

async fn ws_handler(ws: WebSocketUpgrade, State(log): State<FrameLog>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| serve(socket, log))
}

// Echo server: every subscribe frame is answered with one INSERT event on
// the subscribed table so tests can observe routing.
async fn serve(mut socket: WebSocket, log: FrameLog) {
    while let Some(Ok(msg)) = socket.recv().await {
        if let Message::Text(text) = msg {
            let frame: serde_json::Value = serde_json::from_str(&text).unwrap();
            log.lock().push(frame.clone());
            if frame["action"] == "subscribe" {
                let table = frame["table"].as_str().unwrap();
                let event = serde_json::json!({
                    "table": table,
                    "eventType": "INSERT",
                    "new": { "marker": table }
                });
                if socket.send(Message::Text(event.to_string())).await.is_err() {
                    break;
                }
            }
        }
    }
}

async fn spawn_feed() -> (SocketAddr, JoinHandle<()>, FrameLog) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    listener.set_nonblocking(true).unwrap();
    let log: FrameLog = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/realtime/v1", get(ws_handler))
        .with_state(log.clone());
    let server = tokio::spawn(async move {
        axum::Server::from_tcp(listener)
            .unwrap()
            .serve(app.into_make_service())
            .await
            .unwrap();
    });
    (addr, server, log)
}

async fn connect(addr: SocketAddr) -> RealtimeClient {
    let config = Config::new(&format!("http://{addr}"), "key").unwrap();
    RealtimeClient::connect(&config).await.unwrap()
}

#[tokio::test]
async fn events_route_to_their_tables_subscription() {
    let (addr, server, _log) = spawn_feed().await;
    let client = connect(addr).await;

    let mut posts = client.subscribe_posts();
    let mut likes = client.subscribe_likes();

    let ev = timeout(Duration::from_secs(2), posts.next_event())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ev.table, "posts");
    assert_eq!(ev.event_type, EventType::Insert);
    assert_eq!(ev.new.unwrap()["marker"], "posts");

    let ev = timeout(Duration::from_secs(2), likes.next_event())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ev.table, "likes");
    server.abort();
}

#[tokio::test]
async fn message_channel_carries_viewer_filter() {
    let (addr, server, log) = spawn_feed().await;
    let client = connect(addr).await;
    let user = Uuid::new_v4();

    let mut sub = client.subscribe_messages(user);
    timeout(Duration::from_secs(2), sub.next_event())
        .await
        .unwrap()
        .unwrap();

    let frames = log.lock().clone();
    let frame = frames
        .iter()
        .find(|f| f["action"] == "subscribe" && f["table"] == "messages")
        .unwrap();
    assert_eq!(
        frame["filter"],
        format!("or(sender_id.eq.{user},receiver_id.eq.{user})")
    );
    server.abort();
}

#[tokio::test]
async fn unsubscribe_sent_only_when_last_listener_drops() {
    let (addr, server, log) = spawn_feed().await;
    let client = connect(addr).await;

    let first = client.subscribe_posts();
    let second = client.subscribe_posts();
    drop(first);
    sleep(Duration::from_millis(200)).await;
    assert!(
        !log.lock().iter().any(|f| f["action"] == "unsubscribe"),
        "unsubscribe must wait for the last listener"
    );

    second.close();
    sleep(Duration::from_millis(200)).await;
    let frames = log.lock().clone();
    let frame = frames
        .iter()
        .find(|f| f["action"] == "unsubscribe")
        .unwrap();
    assert_eq!(frame["table"], "posts");
    server.abort();
}

#[tokio::test]
async fn lost_connection_closes_pending_subscriptions() {
    let (addr, server, _log) = spawn_feed().await;
    let client = connect(addr).await;

    let mut sub = client.subscribe_comments();
    timeout(Duration::from_secs(2), sub.next_event())
        .await
        .unwrap()
        .unwrap();

    server.abort();
    let err = timeout(Duration::from_secs(2), sub.next_event())
        .await
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, SubscriptionError::Closed));
}
