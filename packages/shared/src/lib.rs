//! Shared utilities for the tsunagi realtime chat workspace.
//!
//! Both the server and the client depend on this crate for clock access
//! and logging setup.

pub mod logger;
pub mod time;
