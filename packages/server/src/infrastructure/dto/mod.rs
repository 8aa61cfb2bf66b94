//! Data Transfer Objects (DTOs) for the realtime protocol.
//!
//! DTOs are organized by protocol:
//! - `websocket`: WebSocket intent/event DTOs
//! - `http`: HTTP API response DTOs

pub mod conversion;
pub mod http;
pub mod websocket;
