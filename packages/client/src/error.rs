//! Error types for the chat client.

use thiserror::Error;

/// Client-specific errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server refused the handshake token
    #[error("Handshake was rejected for token '{0}'")]
    AuthenticationRejected(String),

    /// Connection error
    #[error("Connection error: {0}")]
    ConnectionError(String),
}
