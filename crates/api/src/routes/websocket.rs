use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        State,
    },
    http::HeaderMap,
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::protocol::{self, ClientFrame, ServerFrame};
use crate::util::bearer_token;
use crate::AppState;

/// Connection handshake. Authentication happens exactly once, here: a valid
/// bearer credential in the handshake headers binds the principal to the
/// connection for its entire lifetime. A missing or invalid credential does
/// not reject the connection; it proceeds unauthenticated and simply never
/// receives private-queue traffic.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Response {
    let principal = match bearer_token(&headers) {
        Some(token) => match state.authenticate(&token).await {
            Ok((user, _session)) => Some(user),
            Err(_) => {
                warn!("websocket handshake credential rejected, continuing unauthenticated");
                None
            }
        },
        None => None,
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, principal))
}

async fn handle_socket(socket: WebSocket, state: AppState, principal: Option<lendline_auth::User>) {
    let (mut ws_sender, mut receiver) = socket.split();
    let principal_id = principal.as_ref().map(|user| user.id);

    let (out_tx, mut out_rx) = mpsc::channel::<ServerFrame>(100);
    let sender_task = tokio::spawn(async move {
        while let Some(frame) = out_rx.recv().await {
            let json = match serde_json::to_string(&frame) {
                Ok(json) => json,
                Err(error) => {
                    warn!(error = ?error, "failed to serialize server frame");
                    continue;
                }
            };
            if ws_sender.send(WsMessage::Text(json)).await.is_err() {
                break;
            }
        }
    });

    // An authenticated connection is attached to its own private queue so
    // room-list updates arrive without an explicit subscribe.
    let mut forward_tasks: HashMap<i64, JoinHandle<()>> = HashMap::new();
    let mut user_queue_task = None;
    if let Some(user_id) = principal_id {
        let channel = state.channels().user_channel(user_id).await;
        user_queue_task = Some(spawn_forwarder(channel.subscribe(), out_tx.clone()));
        info!(user_id, "websocket connection authenticated");
    }

    while let Some(message) = receiver.next().await {
        match message {
            Ok(WsMessage::Text(text)) => match serde_json::from_str::<ClientFrame>(&text) {
                Ok(frame) => {
                    handle_client_frame(frame, &out_tx, &state, &mut forward_tasks).await;
                }
                Err(error) => {
                    debug!(error = ?error, "unparseable client frame");
                    let _ = out_tx
                        .send(ServerFrame::Error {
                            message: "invalid frame format".to_string(),
                        })
                        .await;
                }
            },
            Ok(WsMessage::Close(_)) => break,
            Err(error) => {
                debug!(error = ?error, "websocket receive error");
                break;
            }
            _ => {
                // Ping/pong/binary are ignored.
            }
        }
    }

    for (_, task) in forward_tasks {
        task.abort();
    }
    if let Some(task) = user_queue_task {
        task.abort();
    }
    sender_task.abort();

    debug!(user_id = ?principal_id, "websocket connection closed");
}

async fn handle_client_frame(
    frame: ClientFrame,
    out_tx: &mpsc::Sender<ServerFrame>,
    state: &AppState,
    forward_tasks: &mut HashMap<i64, JoinHandle<()>>,
) {
    match frame {
        ClientFrame::Subscribe { destination } => {
            let Some(room_id) = protocol::parse_topic_destination(&destination) else {
                let _ = out_tx
                    .send(ServerFrame::Error {
                        message: format!("invalid destination: {destination}"),
                    })
                    .await;
                return;
            };

            match state.rooms().find_by_id(room_id).await {
                Ok(Some(_)) => {}
                Ok(None) => {
                    let _ = out_tx
                        .send(ServerFrame::Error {
                            message: "room not found".to_string(),
                        })
                        .await;
                    return;
                }
                Err(error) => {
                    warn!(error = ?error, room_id, "room lookup failed during subscribe");
                    let _ = out_tx
                        .send(ServerFrame::Error {
                            message: "failed to subscribe".to_string(),
                        })
                        .await;
                    return;
                }
            }

            let channel = state.channels().room_channel(room_id).await;
            let task = spawn_forwarder(channel.subscribe(), out_tx.clone());
            if let Some(previous) = forward_tasks.insert(room_id, task) {
                previous.abort();
            }

            let _ = out_tx.send(ServerFrame::Subscribed { destination }).await;
        }
        ClientFrame::Unsubscribe { destination } => {
            if let Some(room_id) = protocol::parse_topic_destination(&destination) {
                if let Some(task) = forward_tasks.remove(&room_id) {
                    task.abort();
                }
            }
            let _ = out_tx.send(ServerFrame::Unsubscribed { destination }).await;
        }
        ClientFrame::Send {
            destination,
            payload,
        } => {
            let Some(room_id) = protocol::parse_send_destination(&destination) else {
                let _ = out_tx
                    .send(ServerFrame::Error {
                        message: format!("invalid destination: {destination}"),
                    })
                    .await;
                return;
            };

            match state
                .send_message(
                    room_id,
                    payload.sender_id,
                    payload.content.as_deref(),
                    payload.image_url.as_deref(),
                )
                .await
            {
                Ok(_) => {
                    // Delivery to this connection, if subscribed, happens
                    // through the room broadcast like everyone else's.
                }
                Err(error) => {
                    debug!(error = ?error, room_id, "websocket send rejected");
                    let _ = out_tx
                        .send(ServerFrame::Error {
                            message: error.to_string(),
                        })
                        .await;
                }
            }
        }
    }
}

fn spawn_forwarder(
    mut channel: tokio::sync::broadcast::Receiver<ServerFrame>,
    out_tx: mpsc::Sender<ServerFrame>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Ok(frame) = channel.recv().await {
            if out_tx.send(frame).await.is_err() {
                break;
            }
        }
    })
}
