//! UI layer: transport-facing surface of the realtime server.

pub mod handler;
pub mod server;
pub mod signal;
pub mod state;

pub use server::Server;
