use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, error, info, warn};

use hireup_db::Database;
use hireup_types::api::{Envelope, Session};
use hireup_types::events::GatewayEvent;

use crate::broker::Broker;

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

const SESSION_NOT_PROVIDED: &str = "No session provided";
const SESSION_NOT_FOUND: &str = "Session not found";
const UNKNOWN_ERROR: &str = "An unknown error occurred";

/// Drive one client connection through its lifecycle:
/// Connecting -> Authenticating -> Subscribed -> Closed.
///
/// `session_token` is the `sessionId` query parameter of the upgrade
/// request. Authentication failures are client configuration errors: the
/// gateway sends one error frame and closes, no retry.
pub async fn handle_connection(
    socket: WebSocket,
    broker: Broker,
    db: Arc<Database>,
    session_token: Option<String>,
) {
    let (mut sender, receiver) = socket.split();

    // Authenticating
    let token = match session_token {
        Some(token) if !token.is_empty() => token,
        _ => {
            reject(&mut sender, SESSION_NOT_PROVIDED).await;
            return;
        }
    };

    let lookup = {
        let db = db.clone();
        let token = token.clone();
        tokio::task::spawn_blocking(move || db.get_session(&token)).await
    };
    let session = match lookup {
        Ok(Ok(Some(session))) => session,
        Ok(Ok(None)) => {
            warn!("Gateway session {} not found", token);
            reject(&mut sender, SESSION_NOT_FOUND).await;
            return;
        }
        Ok(Err(e)) => {
            error!("Session lookup failed: {}", e);
            reject(&mut sender, UNKNOWN_ERROR).await;
            return;
        }
        Err(e) => {
            error!("Session lookup task failed: {}", e);
            reject(&mut sender, UNKNOWN_ERROR).await;
            return;
        }
    };

    info!(
        "{} ({}) connected to gateway",
        session.user_slug, session.user_id
    );

    // Subscribed: one channel per user slug carries events for all of
    // this user's conversations.
    let (subscriber_id, events) = broker.subscribe(&session.user_slug).await;

    let ack = Envelope::ok(GatewayEvent::Subscribed);
    if sender
        .send(Message::Text(
            serde_json::to_string(&ack).unwrap().into(),
        ))
        .await
        .is_err()
    {
        broker.unsubscribe(&session.user_slug, subscriber_id).await;
        return;
    }

    run_subscribed_loop(sender, receiver, events, &session).await;

    // Closed
    broker.unsubscribe(&session.user_slug, subscriber_id).await;
    info!(
        "{} ({}) disconnected from gateway",
        session.user_slug, session.user_id
    );
}

/// Relay bus events to the client until either side goes away, with a
/// ping/pong heartbeat. The connection is receive-only: client text
/// frames are ignored, all mutation happens over request/response.
async fn run_subscribed_loop(
    mut sender: SplitSink<WebSocket, Message>,
    mut receiver: SplitStream<WebSocket>,
    mut events: tokio::sync::mpsc::UnboundedReceiver<GatewayEvent>,
    session: &Session,
) {
    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else { break };
                    let frame = Envelope::ok(event);
                    let text = serde_json::to_string(&frame).unwrap();
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("Heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    let slug = session.user_slug.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    debug!(
                        "{} sent a {}-byte frame on a receive-only connection",
                        slug,
                        text.len()
                    );
                }
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
}

/// Send one error frame and close. Used for the
/// Authenticating -> Closed failure edge.
async fn reject(sender: &mut SplitSink<WebSocket, Message>, error: &str) {
    let frame = Envelope::<GatewayEvent>::err(error);
    let _ = sender
        .send(Message::Text(
            serde_json::to_string(&frame).unwrap().into(),
        ))
        .await;
    let _ = sender.send(Message::Close(None)).await;
}
