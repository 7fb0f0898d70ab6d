use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use chrono::Duration;
use futures_util::StreamExt;
use serde::Deserialize;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use hireup_db::Database;
use hireup_gateway::{connection, Broker};
use hireup_types::events::{GatewayEvent, SentMessage};
use hireup_types::models::{AccountType, MessageView, UserProfile};

#[derive(Clone)]
struct GatewayState {
    broker: Broker,
    db: Arc<Database>,
}

#[derive(Deserialize)]
struct WsQuery {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

async fn ws_upgrade(
    State(state): State<GatewayState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        connection::handle_connection(socket, state.broker, state.db, query.session_id)
    })
}

fn fixture() -> (GatewayState, String) {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let alice = db
        .create_user("alice", "Alice", "Archer", AccountType::User)
        .unwrap();
    let token = db.create_session(alice, Duration::days(1)).unwrap();

    let state = GatewayState {
        broker: Broker::new(),
        db,
    };
    (state, token)
}

async fn spawn_gateway(state: GatewayState) -> SocketAddr {
    let app = Router::new().route("/ws", get(ws_upgrade)).with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

type ClientSocket =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn next_json(socket: &mut ClientSocket) -> serde_json::Value {
    loop {
        match socket.next().await.expect("socket closed").unwrap() {
            WsMessage::Text(text) => return serde_json::from_str(text.as_str()).unwrap(),
            WsMessage::Ping(_) | WsMessage::Pong(_) => continue,
            other => panic!("unexpected frame {other:?}"),
        }
    }
}

fn sent_message(content: &str) -> GatewayEvent {
    GatewayEvent::SentMessage(SentMessage {
        message: MessageView {
            id: 1,
            content: content.into(),
            read: false,
            deleted: false,
            created_at: chrono::Utc::now(),
            sender: UserProfile {
                id: 2,
                slug: "bob".into(),
                first_name: "Bob".into(),
                last_name: "Baker".into(),
            },
            reply: None,
        },
        conversation_id: "conv-1".into(),
    })
}

#[tokio::test]
async fn missing_session_gets_error_frame_then_close() {
    let (state, _token) = fixture();
    let addr = spawn_gateway(state).await;

    let (mut socket, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();

    let frame = next_json(&mut socket).await;
    assert_eq!(frame["success"], false);
    assert_eq!(frame["error"], "No session provided");

    assert!(matches!(
        socket.next().await,
        Some(Ok(WsMessage::Close(_))) | None
    ));
}

#[tokio::test]
async fn unknown_session_gets_error_frame_then_close() {
    let (state, _token) = fixture();
    let addr = spawn_gateway(state).await;

    let (mut socket, _) = connect_async(format!("ws://{addr}/ws?sessionId=bogus-token"))
        .await
        .unwrap();

    let frame = next_json(&mut socket).await;
    assert_eq!(frame["success"], false);
    assert_eq!(frame["error"], "Session not found");

    assert!(matches!(
        socket.next().await,
        Some(Ok(WsMessage::Close(_))) | None
    ));
}

#[tokio::test]
async fn authenticated_client_is_acked_and_receives_pushed_events() {
    let (state, token) = fixture();
    let broker = state.broker.clone();
    let addr = spawn_gateway(state).await;

    let (mut socket, _) = connect_async(format!("ws://{addr}/ws?sessionId={token}"))
        .await
        .unwrap();

    // The ack is sent only after the subscription is registered, so a
    // publish after it is guaranteed to reach this socket.
    let ack = next_json(&mut socket).await;
    assert_eq!(ack["success"], true);
    assert_eq!(ack["data"]["type"], "subscribed");
    assert_eq!(broker.subscriber_count("alice").await, 1);

    broker.publish("alice", sent_message("hi")).await;

    let frame = next_json(&mut socket).await;
    assert_eq!(frame["success"], true);
    assert_eq!(frame["data"]["type"], "sent_message");
    assert_eq!(frame["data"]["data"]["content"], "hi");
    assert_eq!(frame["data"]["data"]["conversationId"], "conv-1");

    // Closing the socket tears the subscription down.
    drop(socket);
    for _ in 0..50 {
        if broker.subscriber_count("alice").await == 0 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    assert_eq!(broker.subscriber_count("alice").await, 0);
}
