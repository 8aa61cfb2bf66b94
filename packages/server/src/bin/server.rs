//! Realtime messaging and presence server for tsunagi.
//!
//! Accepts WebSocket connections, fans out chat messages, read receipts,
//! typing signals and presence transitions to every joined connection.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin tsunagi-server
//! cargo run --bin tsunagi-server -- --host 0.0.0.0 --port 3000
//! ```

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::Mutex;

use tsunagi_server::{
    domain::{ConnectionRegistry, RoomMembership},
    infrastructure::{
        directory::{DevTokenVerifier, InMemoryParticipantDirectory},
        notification::LoggingNotificationDispatcher,
        pusher::WebSocketMessagePusher,
        store::InMemoryMessageStore,
    },
    ui::{Server, state::AppState},
    usecase::{
        ConnectUseCase, DisconnectUseCase, FetchHistoryUseCase, JoinRoomUseCase, LeaveRoomUseCase,
        MarkReadUseCase, PresenceTracker, SendMessageUseCase, TypingCoordinator,
    },
};
use tsunagi_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "tsunagi-server")]
#[command(about = "Realtime chat server with presence and typing fan-out", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// Grace period in seconds before a disconnected user is reported offline
    #[arg(long, default_value = "10")]
    presence_grace_secs: u64,

    /// Seconds before a typing signal expires without a refresh
    #[arg(long, default_value = "5")]
    typing_expiry_secs: u64,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();

    // Initialize dependencies in order:
    // 1. Shared state (registry, membership)
    // 2. Infrastructure (store, directory, verifier, pusher, notifier)
    // 3. UseCases
    // 4. AppState + Server

    // 1. Shared in-memory state, rebuilt from scratch on restart
    let registry = Arc::new(Mutex::new(ConnectionRegistry::new()));
    let membership = Arc::new(Mutex::new(RoomMembership::new()));

    // 2. Infrastructure implementations of the domain collaborator traits.
    //    The dev verifier/directory stand in for the external auth and
    //    conversation services of a full deployment.
    let store = Arc::new(InMemoryMessageStore::new());
    let directory = Arc::new(InMemoryParticipantDirectory::allow_all());
    let verifier = Arc::new(DevTokenVerifier);
    let pusher = Arc::new(WebSocketMessagePusher::new());
    let notifier = Arc::new(LoggingNotificationDispatcher);

    // 3. Create UseCases
    let presence_tracker = Arc::new(PresenceTracker::new(
        registry.clone(),
        pusher.clone(),
        Duration::from_secs(args.presence_grace_secs),
    ));
    let typing_coordinator = Arc::new(TypingCoordinator::new(
        registry.clone(),
        membership.clone(),
        directory.clone(),
        pusher.clone(),
        Duration::from_secs(args.typing_expiry_secs),
    ));
    let connect_usecase = Arc::new(ConnectUseCase::new(
        verifier,
        registry.clone(),
        pusher.clone(),
        presence_tracker.clone(),
    ));
    let disconnect_usecase = Arc::new(DisconnectUseCase::new(
        registry.clone(),
        membership.clone(),
        pusher.clone(),
        presence_tracker.clone(),
    ));
    let join_room_usecase = Arc::new(JoinRoomUseCase::new(
        directory.clone(),
        membership.clone(),
        registry.clone(),
    ));
    let leave_room_usecase = Arc::new(LeaveRoomUseCase::new(membership.clone()));
    let send_message_usecase = Arc::new(SendMessageUseCase::new(
        directory.clone(),
        store.clone(),
        registry.clone(),
        membership.clone(),
        pusher.clone(),
        notifier,
        typing_coordinator.clone(),
    ));
    let mark_read_usecase = Arc::new(MarkReadUseCase::new(
        directory.clone(),
        membership.clone(),
        pusher.clone(),
    ));
    let fetch_history_usecase = Arc::new(FetchHistoryUseCase::new(
        directory.clone(),
        store.clone(),
        pusher.clone(),
    ));

    // 4. Create and run the server
    let server = Server::new(AppState {
        connect_usecase,
        disconnect_usecase,
        join_room_usecase,
        leave_room_usecase,
        send_message_usecase,
        typing_coordinator,
        mark_read_usecase,
        fetch_history_usecase,
        presence_tracker,
        pusher,
    });
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
