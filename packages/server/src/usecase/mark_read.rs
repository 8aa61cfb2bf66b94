//! UseCase: 既読通知処理
//!
//! 参加者の既読位置をルームの参加表明済み接続へブロードキャストする。
//! タイピングと同じく表示用の advisory ストリームで、永続化はしない。
//! ただし非参加者がルームの存在やメンバーを探るのに使えないよう、
//! 認可だけは送信と同じ基準で確認する。

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::domain::{
    AuthorizationError, MessageId, MessagePusher, ParticipantDirectory, RoomId, RoomMembership,
    UserId,
};
use crate::infrastructure::dto::websocket::ServerEvent;

use super::error::MarkReadError;

/// 既読通知のユースケース
pub struct MarkReadUseCase {
    /// 参加者ディレクトリ（認可の抽象化）
    directory: Arc<dyn ParticipantDirectory>,
    /// ルームメンバーシップ（共有状態）
    membership: Arc<Mutex<RoomMembership>>,
    /// MessagePusher（イベント配信の抽象化）
    pusher: Arc<dyn MessagePusher>,
}

impl MarkReadUseCase {
    /// 新しい MarkReadUseCase を作成
    pub fn new(
        directory: Arc<dyn ParticipantDirectory>,
        membership: Arc<Mutex<RoomMembership>>,
        pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            directory,
            membership,
            pusher,
        }
    }

    /// 既読通知を実行
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - 既読イベントを配信できた接続数
    /// * `Err(MarkReadError)` - 認可の失敗
    pub async fn execute(
        &self,
        user_id: &UserId,
        room_id: RoomId,
        message_id: MessageId,
    ) -> Result<usize, MarkReadError> {
        if !self.directory.is_participant(user_id, &room_id).await {
            return Err(MarkReadError::Unauthorized(AuthorizationError {
                user_id: user_id.as_str().to_string(),
                room_id: room_id.as_str().to_string(),
            }));
        }

        let targets = {
            let membership = self.membership.lock().await;
            membership.members_of(&room_id)
        };
        let event = ServerEvent::ReadReceipt {
            room_id: room_id.as_str().to_string(),
            message_id: message_id.as_str().to_string(),
            user_id: user_id.as_str().to_string(),
        };
        Ok(self.pusher.broadcast(&targets, &event.to_json()).await)
    }
}
