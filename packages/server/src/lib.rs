//! Realtime messaging and presence delivery server for tsunagi.
//!
//! This library provides the room/connection management, message fan-out,
//! presence tracking and typing coordination for a WebSocket-based chat
//! backend.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
