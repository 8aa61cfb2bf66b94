//! Conversion logic between DTOs and domain entities.

use crate::domain::{MessageEvent, Presence, PresenceState, UserId};

use super::http::PresenceEntryDto;
use super::websocket::{PresenceStatus, ServerEvent};

// ========================================
// Domain Entity → DTO
// ========================================

impl From<&MessageEvent> for ServerEvent {
    fn from(event: &MessageEvent) -> Self {
        ServerEvent::MessageDelivered {
            message_id: event.id.as_str().to_string(),
            room_id: event.room_id.as_str().to_string(),
            sender_id: event.sender_id.as_str().to_string(),
            content: event.content.as_str().to_string(),
            sequence: event.sequence.value(),
            timestamp: event.timestamp.value(),
            correlation_id: event
                .correlation_id
                .as_ref()
                .map(|id| id.as_str().to_string()),
        }
    }
}

impl From<PresenceState> for PresenceStatus {
    fn from(state: PresenceState) -> Self {
        match state {
            PresenceState::Online => PresenceStatus::Online,
            PresenceState::Offline => PresenceStatus::Offline,
        }
    }
}

/// プレゼンス遷移を presence_changed イベントへ変換する
pub fn presence_changed_event(user_id: &UserId, presence: &Presence) -> ServerEvent {
    ServerEvent::PresenceChanged {
        user_id: user_id.as_str().to_string(),
        status: presence.state.into(),
        last_seen_at: presence.last_seen_at.map(|t| t.value()),
    }
}

/// プレゼンスのスナップショットを HTTP DTO へ変換する
pub fn presence_entry_dto(user_id: &UserId, presence: &Presence) -> PresenceEntryDto {
    PresenceEntryDto {
        user_id: user_id.as_str().to_string(),
        status: presence.state.into(),
        last_seen_at: presence.last_seen_at.map(|t| t.value()),
    }
}
