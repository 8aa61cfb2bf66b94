//! Client execution logic with reconnect and backoff support.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    error::ClientError,
    reconciler::{ReconnectReconciler, next_backoff},
    session::run_client_session,
};

const MAX_RECONNECT_ATTEMPTS: u32 = 10;

/// Run the chat client, reconnecting with exponential backoff.
///
/// The reconciler outlives individual sessions: after a transport loss it
/// remembers the open rooms and last held sequences, so the next session
/// re-joins and replays only the gap.
pub async fn run_client(
    url: String,
    token: String,
    rooms: Vec<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let reconciler = Arc::new(Mutex::new(ReconnectReconciler::new()));
    let mut reconnect_count = 0;

    loop {
        tracing::info!(
            "Attempting to connect to {} as '{}' (attempt {}/{})",
            url,
            token,
            reconnect_count + 1,
            MAX_RECONNECT_ATTEMPTS
        );

        match run_client_session(&url, &token, reconciler.clone(), &rooms).await {
            Ok(_) => {
                tracing::info!("Client session ended normally");
                // If connection ended normally (user exit), don't reconnect
                break;
            }
            Err(e) => {
                // A rejected handshake will never succeed on retry
                if let Some(client_err) = e.downcast_ref::<ClientError>()
                    && matches!(client_err, ClientError::AuthenticationRejected(_))
                {
                    tracing::error!("{}", e);
                    tracing::error!("The server rejected this identity. Exiting.");
                    std::process::exit(1);
                }

                tracing::warn!("Connection lost: {}", e);

                let backoff = next_backoff(reconnect_count);
                reconnect_count += 1;

                if reconnect_count >= MAX_RECONNECT_ATTEMPTS {
                    tracing::error!(
                        "Failed to reconnect after {} attempts. Exiting.",
                        MAX_RECONNECT_ATTEMPTS
                    );
                    std::process::exit(1);
                }

                tracing::info!(
                    "Reconnecting in {:?}... (attempt {}/{})",
                    backoff,
                    reconnect_count + 1,
                    MAX_RECONNECT_ATTEMPTS
                );

                tokio::time::sleep(backoff).await;
            }
        }
    }

    Ok(())
}
