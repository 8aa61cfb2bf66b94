//! 参加者ディレクトリの trait 定義
//!
//! 会話の参加者名簿はこのコアの外側（会話の CRUD を持つ層）が管理する
//! 外部コラボレータ。コアは join / send / markRead の認可判定と、
//! オフライン参加者への通知先の列挙にのみ使う。

use async_trait::async_trait;

use super::value_object::{RoomId, UserId};

/// 会話 → 参加者名簿へのインターフェース
#[async_trait]
pub trait ParticipantDirectory: Send + Sync {
    /// ユーザーがルームの参加者かどうか
    async fn is_participant(&self, user_id: &UserId, room_id: &RoomId) -> bool;

    /// ルームの参加者一覧
    async fn participants_of(&self, room_id: &RoomId) -> Vec<UserId>;
}
