//! ドメイン層のエンティティ
//!
//! - [`MessageEvent`]: 永続化が確定した後にファンアウトされるメッセージイベント
//! - [`Presence`]: ユーザーごとのオンライン / オフライン状態（導出状態）

use super::value_object::{
    CorrelationId, MessageContent, MessageId, RoomId, Sequence, Timestamp, UserId,
};

/// 永続化確定後にファンアウトされるメッセージイベント
///
/// `id` / `sequence` / `timestamp` は永続化層（メッセージストア）が採番する。
/// ディスパッチャは永続化が成功するまでこのイベントを生成できず、
/// したがって未コミットのメッセージが配信されることはない。
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEvent {
    /// メッセージ識別子（ストア採番）
    pub id: MessageId,
    /// 会話（ルーム）識別子
    pub room_id: RoomId,
    /// 送信者
    pub sender_id: UserId,
    /// 本文
    pub content: MessageContent,
    /// ルーム内の順序を決める連番（ストア採番）
    pub sequence: Sequence,
    /// サーバー確定時刻
    pub timestamp: Timestamp,
    /// クライアント採番の相関 ID（楽観的表示の突き合わせ用）
    pub correlation_id: Option<CorrelationId>,
}

/// プレゼンスの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceState {
    Online,
    Offline,
}

/// ユーザーごとのプレゼンスのスナップショット
///
/// 接続レジストリの遷移から導出される値で、クライアントが直接書き換えることはない。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Presence {
    pub state: PresenceState,
    /// 最後にオンラインを観測した時刻（一度も接続していないユーザーは None）
    pub last_seen_at: Option<Timestamp>,
}

impl Presence {
    pub fn online(at: Timestamp) -> Self {
        Self {
            state: PresenceState::Online,
            last_seen_at: Some(at),
        }
    }

    pub fn offline(last_seen_at: Option<Timestamp>) -> Self {
        Self {
            state: PresenceState::Offline,
            last_seen_at,
        }
    }

    pub fn is_online(&self) -> bool {
        self.state == PresenceState::Online
    }
}

impl Default for Presence {
    fn default() -> Self {
        Self::offline(None)
    }
}
