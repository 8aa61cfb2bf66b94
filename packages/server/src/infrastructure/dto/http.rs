//! HTTP API レスポンスの DTO

use serde::{Deserialize, Serialize};

use super::websocket::PresenceStatus;

/// GET /api/health のレスポンス
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthDto {
    pub status: String,
}

/// GET /api/presence のエントリ
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceEntryDto {
    pub user_id: String,
    pub status: PresenceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen_at: Option<i64>,
}
