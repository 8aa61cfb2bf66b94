//! WebSocket client session management.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use uuid::Uuid;

use tsunagi_server::infrastructure::dto::websocket::{ClientIntent, PresenceStatus, ServerEvent};

use crate::{
    error::ClientError,
    formatter::MessageFormatter,
    reconciler::{ApplyOutcome, ReconnectReconciler},
    ui::redisplay_prompt,
};

fn encode(intent: &ClientIntent) -> String {
    // ClientIntent serialization cannot fail (all fields are simple types)
    serde_json::to_string(intent).unwrap()
}

/// Run one WebSocket client session.
///
/// On entry the session re-joins every room the reconciler tracks and asks
/// the server to replay anything missed since the last held sequence. The
/// session ends when the user exits (Ok) or the transport drops (Err); the
/// caller decides whether to reconnect.
pub async fn run_client_session(
    url: &str,
    token: &str,
    reconciler: Arc<Mutex<ReconnectReconciler>>,
    initial_rooms: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    // Identity is carried as a query parameter, verified before the upgrade
    let url = format!("{}?token={}", url, token);

    let (ws_stream, response) = match connect_async(&url).await {
        Ok(result) => result,
        Err(e) => {
            let error_msg = e.to_string();

            // Check for HTTP 401 Unauthorized
            if error_msg.contains("401") || error_msg.contains("Unauthorized") {
                return Err(Box::new(ClientError::AuthenticationRejected(
                    token.to_string(),
                )));
            }

            return Err(Box::new(ClientError::ConnectionError(error_msg)));
        }
    };

    // Check HTTP status code from response
    if response.status().as_u16() == 401 {
        return Err(Box::new(ClientError::AuthenticationRejected(
            token.to_string(),
        )));
    }

    tracing::info!("Connected to chat server!");
    println!(
        "\nYou are '{}'. Type messages to send to the current room.\n\
         Commands: /join <room>, /leave [room], /rooms, /typing, /read, /retry. Ctrl+C to exit.\n",
        token
    );

    let (mut write, mut read) = ws_stream.split();

    // Re-join tracked rooms. The replay request for each room is sent once
    // its join is acknowledged, so stale rooms reconcile in join order.
    {
        let mut reconciler = reconciler.lock().await;
        for room_id in initial_rooms {
            reconciler.track_room(room_id);
        }
        for request in reconciler.reconnect_plan() {
            if reconciler.is_stale(&request.room_id) {
                print!("{}", MessageFormatter::format_stale_notice(&request.room_id));
            }
            let intent = ClientIntent::Join {
                room_id: request.room_id,
            };
            write.send(Message::Text(encode(&intent).into())).await?;
        }
    }

    // Channel for intents originated by the read task (gap-fetch after join)
    let (outbox_tx, mut outbox_rx) = mpsc::unbounded_channel::<String>();

    // Clone handles for the read task
    let client_id_for_read = token.to_string();
    let reconciler_for_read = reconciler.clone();

    // Spawn a task to handle incoming events
    let mut read_task = tokio::spawn(async move {
        let mut connection_error = false;

        while let Some(message) = read.next().await {
            match message {
                Ok(Message::Text(text)) => match serde_json::from_str::<ServerEvent>(&text) {
                    Ok(event) => {
                        handle_event(
                            &reconciler_for_read,
                            &outbox_tx,
                            &client_id_for_read,
                            event,
                        )
                        .await;
                    }
                    Err(_) => {
                        print!("{}", MessageFormatter::format_raw_message(&text));
                        redisplay_prompt(&client_id_for_read);
                    }
                },
                Ok(Message::Close(_)) => {
                    tracing::info!("Server closed the connection");
                    connection_error = true;
                    break;
                }
                Err(e) => {
                    tracing::warn!("WebSocket read error: {}", e);
                    connection_error = true;
                    break;
                }
                _ => {}
            }
        }

        connection_error
    });

    // Create channel for rustyline input
    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<String>();

    // Spawn a blocking thread for rustyline (synchronous readline)
    let client_id_for_prompt = token.to_string();
    let _readline_handle = std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                eprintln!("Failed to initialize readline: {}", e);
                return;
            }
        };

        let prompt = format!("{}> ", client_id_for_prompt);

        loop {
            match rl.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        rl.add_history_entry(line).ok();
                        if input_tx.send(line.to_string()).is_err() {
                            // Channel closed, exit thread
                            break;
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    // Ctrl+C
                    tracing::info!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    // Ctrl+D
                    tracing::info!("EOF");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });

    // Spawn a task to translate user input into intents and write them,
    // interleaved with read-task-originated intents
    let reconciler_for_write = reconciler.clone();
    let mut current_room: Option<String> = initial_rooms.first().cloned();
    let mut write_task = tokio::spawn(async move {
        let mut write_error = false;

        loop {
            let intents: Vec<String> = tokio::select! {
                maybe_line = input_rx.recv() => match maybe_line {
                    Some(line) => {
                        handle_command(&reconciler_for_write, &mut current_room, &line).await
                    }
                    None => break,
                },
                maybe_json = outbox_rx.recv() => match maybe_json {
                    Some(json) => vec![json],
                    None => break,
                },
            };

            for json in intents {
                if let Err(e) = write.send(Message::Text(json.into())).await {
                    tracing::warn!("Failed to send intent: {}", e);
                    write_error = true;
                    break;
                }
            }
            if write_error {
                break;
            }
        }

        write_error
    });

    // If any one of the tasks completes, abort the other
    let connection_error = tokio::select! {
        read_result = &mut read_task => {
            write_task.abort();
            read_result.unwrap_or(true)
        }
        write_result = &mut write_task => {
            read_task.abort();
            write_result.unwrap_or(true)
        }
    };

    if connection_error {
        // Every tracked room is now possibly missing events
        reconciler.lock().await.on_disconnect();
        return Err(Box::new(ClientError::ConnectionError(
            "Connection lost".to_string(),
        )));
    }

    Ok(())
}

/// Apply one server event to the reconciled view and display it.
async fn handle_event(
    reconciler: &Mutex<ReconnectReconciler>,
    outbox: &mpsc::UnboundedSender<String>,
    client_id: &str,
    event: ServerEvent,
) {
    match event {
        ServerEvent::MessageDelivered {
            message_id,
            room_id,
            sender_id,
            content,
            sequence,
            timestamp,
            correlation_id,
        } => {
            let outcome = {
                let mut reconciler = reconciler.lock().await;
                reconciler.apply_delivered(
                    &room_id,
                    &message_id,
                    sequence,
                    correlation_id.as_deref(),
                )
            };
            match outcome {
                ApplyOutcome::Duplicate => {}
                ApplyOutcome::New {
                    confirmed_correlation: Some(_),
                } => {
                    print!("{}", MessageFormatter::format_confirmation(&room_id, &content));
                    redisplay_prompt(client_id);
                }
                ApplyOutcome::New {
                    confirmed_correlation: None,
                } => {
                    print!(
                        "{}",
                        MessageFormatter::format_message(&room_id, &sender_id, &content, timestamp)
                    );
                    redisplay_prompt(client_id);
                }
            }
        }
        ServerEvent::PresenceChanged {
            user_id, status, ..
        } => {
            print!(
                "{}",
                MessageFormatter::format_presence(&user_id, status == PresenceStatus::Online)
            );
            redisplay_prompt(client_id);
        }
        ServerEvent::Typing {
            room_id,
            user_id,
            is_typing,
        } => {
            print!(
                "{}",
                MessageFormatter::format_typing(&room_id, &user_id, is_typing)
            );
            redisplay_prompt(client_id);
        }
        ServerEvent::RoomJoined { room_id, members } => {
            // Join acknowledged: request anything missed since the last held
            // sequence, then clear the staleness flag
            {
                let mut reconciler = reconciler.lock().await;
                let since = reconciler.last_sequence(&room_id);
                let fetch = ClientIntent::FetchSince {
                    room_id: room_id.clone(),
                    since,
                };
                outbox.send(encode(&fetch)).ok();
                reconciler.mark_reconciled(&room_id);
            }
            print!("{}", MessageFormatter::format_room_joined(&room_id, &members));
            redisplay_prompt(client_id);
        }
        ServerEvent::ReadReceipt {
            room_id,
            message_id,
            user_id,
        } => {
            print!(
                "{}",
                MessageFormatter::format_read_receipt(&room_id, &user_id, &message_id)
            );
            redisplay_prompt(client_id);
        }
        ServerEvent::Error {
            code,
            reason,
            correlation_id,
        } => {
            if let Some(correlation) = correlation_id {
                let mut reconciler = reconciler.lock().await;
                if reconciler.mark_send_failed(&correlation) {
                    let failed_content = reconciler
                        .failed_sends()
                        .into_iter()
                        .find(|message| message.correlation_id == correlation)
                        .map(|message| message.content);
                    if let Some(content) = failed_content {
                        print!("{}", MessageFormatter::format_send_failed(&content, &code));
                        redisplay_prompt(client_id);
                        return;
                    }
                }
            }
            print!("{}", MessageFormatter::format_error(&code, &reason));
            redisplay_prompt(client_id);
        }
    }
}

/// Translate one input line into zero or more intents to send.
async fn handle_command(
    reconciler: &Mutex<ReconnectReconciler>,
    current_room: &mut Option<String>,
    line: &str,
) -> Vec<String> {
    if let Some(room_id) = line.strip_prefix("/join ") {
        let room_id = room_id.trim().to_string();
        if room_id.is_empty() {
            println!("usage: /join <room>");
            return vec![];
        }
        reconciler.lock().await.track_room(&room_id);
        *current_room = Some(room_id.clone());
        return vec![encode(&ClientIntent::Join { room_id })];
    }

    if line == "/leave" || line.starts_with("/leave ") {
        let room_id = line
            .strip_prefix("/leave")
            .map(str::trim)
            .filter(|argument| !argument.is_empty())
            .map(str::to_string)
            .or_else(|| current_room.clone());
        let Some(room_id) = room_id else {
            println!("usage: /leave <room>");
            return vec![];
        };
        reconciler.lock().await.forget_room(&room_id);
        if current_room.as_deref() == Some(room_id.as_str()) {
            *current_room = None;
        }
        return vec![encode(&ClientIntent::Leave { room_id })];
    }

    if line == "/rooms" {
        let reconciler = reconciler.lock().await;
        for room_id in reconciler.open_rooms() {
            let marker = if reconciler.is_stale(&room_id) {
                " (reconciling)"
            } else {
                ""
            };
            println!("{}{}", room_id, marker);
        }
        return vec![];
    }

    if line == "/typing" {
        let Some(room_id) = current_room.clone() else {
            println!("join a room first: /join <room>");
            return vec![];
        };
        return vec![encode(&ClientIntent::TypingStart { room_id })];
    }

    if line == "/read" {
        let Some(room_id) = current_room.clone() else {
            println!("join a room first: /join <room>");
            return vec![];
        };
        let last_message_id = reconciler.lock().await.last_message_id(&room_id);
        let Some(message_id) = last_message_id else {
            println!("no messages in {} yet", room_id);
            return vec![];
        };
        return vec![encode(&ClientIntent::MarkRead {
            room_id,
            message_id,
        })];
    }

    if line == "/retry" {
        let mut reconciler = reconciler.lock().await;
        let failed = reconciler.failed_sends();
        if failed.is_empty() {
            println!("nothing to retry");
            return vec![];
        }
        let mut intents = Vec::new();
        for message in failed {
            if let Some(retry) = reconciler.mark_retrying(&message.correlation_id) {
                intents.push(encode(&ClientIntent::Send {
                    room_id: retry.room_id,
                    correlation_id: retry.correlation_id,
                    content: retry.content,
                }));
            }
        }
        return intents;
    }

    if line.starts_with('/') {
        println!("commands: /join <room>, /leave [room], /rooms, /typing, /read, /retry");
        return vec![];
    }

    // Plain text: optimistic send to the current room
    let Some(room_id) = current_room.clone() else {
        println!("join a room first: /join <room>");
        return vec![];
    };
    let correlation_id = Uuid::new_v4().to_string();
    reconciler
        .lock()
        .await
        .record_send(&room_id, &correlation_id, line);
    vec![encode(&ClientIntent::Send {
        room_id,
        correlation_id,
        content: line.to_string(),
    })]
}
