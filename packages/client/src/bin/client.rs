//! CLI chat client for tsunagi with reconnect and reconciliation support.
//!
//! Connects to a tsunagi realtime server, joins the given rooms and sends
//! messages from stdin. On transport loss it reconnects with exponential
//! backoff, re-joins the open rooms and replays any missed messages.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin tsunagi-client -- --token alice --room lounge
//! cargo run --bin tsunagi-client -- -t bob -r lounge -r dev
//! ```

use clap::Parser;

use tsunagi_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "tsunagi-client")]
#[command(about = "Realtime chat client with reconnect and state reconciliation", long_about = None)]
struct Args {
    /// Identity token presented at the handshake
    #[arg(short = 't', long)]
    token: String,

    /// Room to join on connect (repeatable)
    #[arg(short = 'r', long = "room")]
    rooms: Vec<String>,

    /// WebSocket server URL
    #[arg(short = 'u', long, default_value = "ws://127.0.0.1:8080/ws")]
    url: String,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    // Run the client
    if let Err(e) = tsunagi_client::runner::run_client(args.url, args.token, args.rooms).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
