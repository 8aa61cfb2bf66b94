//! WebSocket プロトコルの DTO
//!
//! クライアント → サーバーのインテントと、サーバー → クライアントのイベントを
//! `type` タグ付きの JSON として定義します。ワイヤエンコーディングは
//! この層に閉じており、ドメイン層は一切 JSON を知りません。

use serde::{Deserialize, Serialize};

/// クライアント → サーバーのインテント
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientIntent {
    /// ルームへの参加表明
    Join { room_id: String },
    /// ルームからの離脱
    Leave { room_id: String },
    /// メッセージ送信
    Send {
        room_id: String,
        correlation_id: String,
        content: String,
    },
    /// 入力中シグナルの開始（refresh を兼ねる）
    TypingStart { room_id: String },
    /// 入力中シグナルの明示的な解除
    TypingStop { room_id: String },
    /// 既読の通知
    MarkRead { room_id: String, message_id: String },
    /// 指定連番より後のメッセージの再送要求（再接続時のギャップ埋め）
    FetchSince { room_id: String, since: u64 },
}

/// プレゼンス状態のワイヤ表現
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceStatus {
    Online,
    Offline,
}

/// サーバー → クライアントのイベント
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// 永続化が確定したメッセージの配信
    MessageDelivered {
        message_id: String,
        room_id: String,
        sender_id: String,
        content: String,
        sequence: u64,
        timestamp: i64,
        #[serde(skip_serializing_if = "Option::is_none")]
        correlation_id: Option<String>,
    },
    /// プレゼンスの確定済み遷移
    PresenceChanged {
        user_id: String,
        status: PresenceStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        last_seen_at: Option<i64>,
    },
    /// 入力中シグナル
    Typing {
        room_id: String,
        user_id: String,
        is_typing: bool,
    },
    /// 参加表明の受理（現在のメンバー一覧つき）
    RoomJoined {
        room_id: String,
        members: Vec<String>,
    },
    /// 既読通知
    ReadReceipt {
        room_id: String,
        message_id: String,
        user_id: String,
    },
    /// 要求元の接続にのみ返す操作エラー
    ///
    /// 送信失敗の場合は相関 ID を載せて返し、クライアントが該当する
    /// 楽観的表示のメッセージを「失敗」状態にできるようにする。
    Error {
        code: String,
        reason: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        correlation_id: Option<String>,
    },
}

impl ServerEvent {
    /// ワイヤ表現（JSON）へシリアライズする
    ///
    /// `ServerEvent` のシリアライズは失敗しない（全フィールドが単純型）。
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_intent_send_roundtrip() {
        // テスト項目: Send インテントが type タグ付き JSON として往復できる
        // given (前提条件):
        let intent = ClientIntent::Send {
            room_id: "r1".to_string(),
            correlation_id: "corr-1".to_string(),
            content: "Hello!".to_string(),
        };

        // when (操作):
        let json = serde_json::to_string(&intent).unwrap();
        let parsed: ClientIntent = serde_json::from_str(&json).unwrap();

        // then (期待する結果):
        assert!(json.contains(r#""type":"send""#));
        assert_eq!(parsed, intent);
    }

    #[test]
    fn test_client_intent_join_from_json() {
        // テスト項目: クライアントが送る join の JSON が正しくパースされる
        // given (前提条件):
        let json = r#"{"type":"join","room_id":"lounge"}"#;

        // when (操作):
        let parsed: ClientIntent = serde_json::from_str(json).unwrap();

        // then (期待する結果):
        assert_eq!(
            parsed,
            ClientIntent::Join {
                room_id: "lounge".to_string()
            }
        );
    }

    #[test]
    fn test_client_intent_unknown_type_is_rejected() {
        // テスト項目: 未知の type タグはパースエラーになる
        // given (前提条件):
        let json = r#"{"type":"dance","room_id":"lounge"}"#;

        // when (操作):
        let parsed = serde_json::from_str::<ClientIntent>(json);

        // then (期待する結果):
        assert!(parsed.is_err());
    }

    #[test]
    fn test_server_event_message_delivered_omits_missing_correlation() {
        // テスト項目: correlation_id が無い場合は JSON に含まれない
        // given (前提条件):
        let event = ServerEvent::MessageDelivered {
            message_id: "m1".to_string(),
            room_id: "r1".to_string(),
            sender_id: "alice".to_string(),
            content: "Hello!".to_string(),
            sequence: 7,
            timestamp: 1000,
            correlation_id: None,
        };

        // when (操作):
        let json = serde_json::to_string(&event).unwrap();

        // then (期待する結果):
        assert!(json.contains(r#""type":"message_delivered""#));
        assert!(!json.contains("correlation_id"));
    }

    #[test]
    fn test_server_event_presence_changed_roundtrip() {
        // テスト項目: presence_changed イベントが往復できる
        // given (前提条件):
        let event = ServerEvent::PresenceChanged {
            user_id: "alice".to_string(),
            status: PresenceStatus::Offline,
            last_seen_at: Some(9000),
        };

        // when (操作):
        let json = serde_json::to_string(&event).unwrap();
        let parsed: ServerEvent = serde_json::from_str(&json).unwrap();

        // then (期待する結果):
        assert!(json.contains(r#""status":"offline""#));
        assert_eq!(parsed, event);
    }
}
