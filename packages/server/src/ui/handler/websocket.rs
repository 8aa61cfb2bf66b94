//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::{
    domain::{
        ConnectionId, ConnectionIdFactory, CorrelationId, MessageContent, MessageId, RoomId,
        Sequence, UserId,
    },
    infrastructure::dto::{conversion::presence_changed_event, websocket::{ClientIntent, ServerEvent}},
    ui::state::AppState,
    usecase::{ConnectError, FetchHistoryError, JoinRoomError, MarkReadError, SendMessageError},
};

/// Query parameters for the WebSocket handshake
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub token: String,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    // Create a channel for this connection to receive events
    let (tx, rx) = mpsc::unbounded_channel();
    let connection_id = ConnectionIdFactory::generate();

    // Identity is verified before the upgrade; a refused handshake never
    // reaches the connection registry
    match state
        .connect_usecase
        .execute(&query.token, connection_id.clone(), tx)
        .await
    {
        Ok((user_id, _connected_at)) => {
            tracing::info!(
                "Connection '{}' established for user '{}'",
                connection_id.as_str(),
                user_id.as_str()
            );
            Ok(ws.on_upgrade(move |socket| {
                handle_socket(socket, state, user_id, connection_id, rx)
            }))
        }
        Err(ConnectError::Authentication(e)) => {
            tracing::warn!("Rejected WebSocket handshake: {}", e);
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

/// Spawns a task that receives events from the rx channel and pushes them to
/// the WebSocket sender.
///
/// This function handles the outbound event flow: fan-out events addressed to
/// this connection (via rx channel) are written to this connection's socket.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    })
}

async fn handle_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    user_id: UserId,
    connection_id: ConnectionId,
    rx: mpsc::UnboundedReceiver<String>,
) {
    let (mut sender, mut receiver) = socket.split();

    // Stream the current presence snapshot to the newly connected client
    // before any live events
    {
        let snapshot = state.connect_usecase.presence_snapshot().await;
        for (snapshot_user, presence) in &snapshot {
            let json = presence_changed_event(snapshot_user, presence).to_json();
            if let Err(e) = sender.send(Message::Text(json.into())).await {
                tracing::error!(
                    "Failed to send presence snapshot to '{}': {}",
                    connection_id.as_str(),
                    e
                );
                state.disconnect_usecase.execute(&connection_id).await;
                return;
            }
        }
        tracing::debug!(
            "Sent presence snapshot ({} user(s)) to '{}'",
            snapshot.len(),
            connection_id.as_str()
        );
    }

    // Spawn a task to push fan-out events to this connection
    let mut send_task = pusher_loop(rx, sender);

    let recv_state = state.clone();
    let recv_user = user_id.clone();
    let recv_connection = connection_id.clone();

    // Spawn a task to receive intents from this connection
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!("WebSocket error: {}", e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    recv_state.connect_usecase.touch(&recv_connection).await;

                    match serde_json::from_str::<ClientIntent>(&text) {
                        Ok(intent) => {
                            dispatch_intent(&recv_state, &recv_user, &recv_connection, intent)
                                .await;
                        }
                        Err(e) => {
                            tracing::warn!(
                                "Failed to parse intent from '{}': {}",
                                recv_connection.as_str(),
                                e
                            );
                            send_error(
                                &recv_state,
                                &recv_connection,
                                "bad_intent",
                                &e.to_string(),
                                None,
                            )
                            .await;
                        }
                    }
                }
                Message::Ping(_) => {
                    tracing::debug!("Received ping");
                    // Ping/pong is handled automatically by the WebSocket protocol
                }
                Message::Close(_) => {
                    tracing::info!(
                        "Connection '{}' requested close",
                        recv_connection.as_str()
                    );
                    break;
                }
                _ => {}
            }
        }
    });

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    // Deregister the connection, cascade membership, schedule presence check
    state.disconnect_usecase.execute(&connection_id).await;
    tracing::info!(
        "Connection '{}' of user '{}' closed",
        connection_id.as_str(),
        user_id.as_str()
    );
}

/// Dispatch a parsed client intent to the matching usecase.
///
/// Operation failures (authorization, persistence, validation) are reported
/// back to the requesting connection only, as `error` events.
async fn dispatch_intent(
    state: &Arc<AppState>,
    user_id: &UserId,
    connection_id: &ConnectionId,
    intent: ClientIntent,
) {
    match intent {
        ClientIntent::Join { room_id } => {
            let room_id = match parse_room(state, connection_id, room_id, None).await {
                Some(room_id) => room_id,
                None => return,
            };
            match state
                .join_room_usecase
                .execute(connection_id.clone(), user_id, room_id.clone())
                .await
            {
                Ok(members) => {
                    let event = ServerEvent::RoomJoined {
                        room_id: room_id.as_str().to_string(),
                        members: members
                            .iter()
                            .map(|member| member.as_str().to_string())
                            .collect(),
                    };
                    push_to_requester(state, connection_id, &event.to_json()).await;
                }
                Err(JoinRoomError::Unauthorized(e)) => {
                    send_error(state, connection_id, "unauthorized", &e.to_string(), None).await;
                }
            }
        }
        ClientIntent::Leave { room_id } => {
            if let Some(room_id) = parse_room(state, connection_id, room_id, None).await {
                state.leave_room_usecase.execute(connection_id, &room_id).await;
            }
        }
        ClientIntent::Send {
            room_id,
            correlation_id,
            content,
        } => {
            let correlation = match CorrelationId::new(correlation_id.clone()) {
                Ok(correlation) => correlation,
                Err(e) => {
                    send_error(state, connection_id, "invalid_intent", &e.to_string(), None).await;
                    return;
                }
            };
            let room_id =
                match parse_room(state, connection_id, room_id, Some(&correlation_id)).await {
                    Some(room_id) => room_id,
                    None => return,
                };
            let content = match MessageContent::new(content) {
                Ok(content) => content,
                Err(e) => {
                    send_error(
                        state,
                        connection_id,
                        "invalid_content",
                        &e.to_string(),
                        Some(&correlation_id),
                    )
                    .await;
                    return;
                }
            };
            match state
                .send_message_usecase
                .execute(
                    connection_id,
                    user_id.clone(),
                    room_id,
                    correlation,
                    content,
                )
                .await
            {
                Ok(_event) => {
                    // The confirmed event reaches the sender through fan-out/ack
                }
                Err(SendMessageError::Unauthorized(e)) => {
                    send_error(
                        state,
                        connection_id,
                        "unauthorized",
                        &e.to_string(),
                        Some(&correlation_id),
                    )
                    .await;
                }
                Err(SendMessageError::Persistence(e)) => {
                    send_error(
                        state,
                        connection_id,
                        "persistence_failed",
                        &e.to_string(),
                        Some(&correlation_id),
                    )
                    .await;
                }
            }
        }
        ClientIntent::TypingStart { room_id } => {
            if let Some(room_id) = parse_room(state, connection_id, room_id, None).await {
                state.typing_coordinator.start(user_id, &room_id).await;
            }
        }
        ClientIntent::TypingStop { room_id } => {
            if let Some(room_id) = parse_room(state, connection_id, room_id, None).await {
                state.typing_coordinator.stop(user_id, &room_id).await;
            }
        }
        ClientIntent::MarkRead {
            room_id,
            message_id,
        } => {
            let room_id = match parse_room(state, connection_id, room_id, None).await {
                Some(room_id) => room_id,
                None => return,
            };
            let message_id = match MessageId::new(message_id) {
                Ok(message_id) => message_id,
                Err(e) => {
                    send_error(state, connection_id, "invalid_intent", &e.to_string(), None).await;
                    return;
                }
            };
            if let Err(MarkReadError::Unauthorized(e)) = state
                .mark_read_usecase
                .execute(user_id, room_id, message_id)
                .await
            {
                send_error(state, connection_id, "unauthorized", &e.to_string(), None).await;
            }
        }
        ClientIntent::FetchSince { room_id, since } => {
            let room_id = match parse_room(state, connection_id, room_id, None).await {
                Some(room_id) => room_id,
                None => return,
            };
            match state
                .fetch_history_usecase
                .execute(connection_id, user_id, room_id, Sequence::new(since))
                .await
            {
                Ok(_replayed) => {}
                Err(FetchHistoryError::Unauthorized(e)) => {
                    send_error(state, connection_id, "unauthorized", &e.to_string(), None).await;
                }
                Err(FetchHistoryError::Persistence(e)) => {
                    send_error(state, connection_id, "persistence_failed", &e.to_string(), None)
                        .await;
                }
            }
        }
    }
}

/// Convert a wire room id into the domain type, reporting failures to the
/// requesting connection.
async fn parse_room(
    state: &Arc<AppState>,
    connection_id: &ConnectionId,
    room_id: String,
    correlation_id: Option<&str>,
) -> Option<RoomId> {
    match RoomId::new(room_id) {
        Ok(room_id) => Some(room_id),
        Err(e) => {
            send_error(state, connection_id, "invalid_room", &e.to_string(), correlation_id).await;
            None
        }
    }
}

async fn send_error(
    state: &Arc<AppState>,
    connection_id: &ConnectionId,
    code: &str,
    reason: &str,
    correlation_id: Option<&str>,
) {
    let event = ServerEvent::Error {
        code: code.to_string(),
        reason: reason.to_string(),
        correlation_id: correlation_id.map(str::to_string),
    };
    push_to_requester(state, connection_id, &event.to_json()).await;
}

async fn push_to_requester(state: &Arc<AppState>, connection_id: &ConnectionId, json: &str) {
    if let Err(e) = state.pusher.push_to(connection_id, json).await {
        tracing::debug!(
            "Failed to respond to connection '{}': {}",
            connection_id.as_str(),
            e
        );
    }
}
