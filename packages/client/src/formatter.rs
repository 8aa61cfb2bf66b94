//! Pure formatting of server events for terminal display.

use chrono::{TimeZone, Utc};

/// Formats server events into display strings.
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format a timestamp (UTC milliseconds) as HH:MM:SS
    fn format_time(timestamp_millis: i64) -> String {
        let seconds = timestamp_millis / 1000;
        let nanos = ((timestamp_millis % 1000) * 1_000_000) as u32;
        match Utc.timestamp_opt(seconds, nanos) {
            chrono::LocalResult::Single(dt) => dt.format("%H:%M:%S").to_string(),
            _ => "--:--:--".to_string(),
        }
    }

    /// A chat message delivered to a room
    pub fn format_message(
        room_id: &str,
        sender_id: &str,
        content: &str,
        timestamp_millis: i64,
    ) -> String {
        format!(
            "\n[{} {}] {}: {}\n",
            Self::format_time(timestamp_millis),
            room_id,
            sender_id,
            content
        )
    }

    /// Confirmation that one of our own optimistic messages was persisted
    pub fn format_confirmation(room_id: &str, content: &str) -> String {
        format!("\n[{}] delivered: {}\n", room_id, content)
    }

    /// A presence transition
    pub fn format_presence(user_id: &str, online: bool) -> String {
        let state = if online { "online" } else { "offline" };
        format!("\n* {} is now {}\n", user_id, state)
    }

    /// A typing signal
    pub fn format_typing(room_id: &str, user_id: &str, is_typing: bool) -> String {
        if is_typing {
            format!("\n[{}] {} is typing...\n", room_id, user_id)
        } else {
            format!("\n[{}] {} stopped typing\n", room_id, user_id)
        }
    }

    /// Acknowledgement of a join, with the current member list
    pub fn format_room_joined(room_id: &str, members: &[String]) -> String {
        format!("\n* joined {} (members: {})\n", room_id, members.join(", "))
    }

    /// A read receipt
    pub fn format_read_receipt(room_id: &str, user_id: &str, message_id: &str) -> String {
        format!("\n[{}] {} read up to {}\n", room_id, user_id, message_id)
    }

    /// An operation error reported by the server
    pub fn format_error(code: &str, reason: &str) -> String {
        format!("\n! {}: {}\n", code, reason)
    }

    /// A send that failed; the local message is kept for manual retry
    pub fn format_send_failed(content: &str, reason: &str) -> String {
        format!("\n! send failed ({}): {} - use /retry\n", reason, content)
    }

    /// A room whose history may be incomplete after a reconnect
    pub fn format_stale_notice(room_id: &str) -> String {
        format!("\n* {} may be out of date, reconciling...\n", room_id)
    }

    /// Unparseable payload, shown raw
    pub fn format_raw_message(text: &str) -> String {
        format!("\n{}\n", text)
    }
}
