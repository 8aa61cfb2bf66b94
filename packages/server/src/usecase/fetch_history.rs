//! UseCase: 履歴再送処理
//!
//! 再接続したクライアントが切断中に取りこぼしたメッセージを埋めるための
//! ギャップフェッチ。クライアントが保持する最後の連番を受け取り、
//! それより後の確定イベントを採番順のまま要求元の接続にだけ再送する。
//!
//! 再送は通常配信と同じ message_delivered イベントを使う。重複して届いた
//! イベントの排除はクライアント側がメッセージ ID で行う。

use std::sync::Arc;

use crate::domain::{
    AuthorizationError, ConnectionId, MessagePusher, MessageStore, ParticipantDirectory, RoomId,
    Sequence, UserId,
};
use crate::infrastructure::dto::websocket::ServerEvent;

use super::error::FetchHistoryError;

/// 履歴再送のユースケース
pub struct FetchHistoryUseCase {
    /// 参加者ディレクトリ（認可の抽象化）
    directory: Arc<dyn ParticipantDirectory>,
    /// メッセージストア（履歴の読み出し元）
    store: Arc<dyn MessageStore>,
    /// MessagePusher（イベント配信の抽象化）
    pusher: Arc<dyn MessagePusher>,
}

impl FetchHistoryUseCase {
    /// 新しい FetchHistoryUseCase を作成
    pub fn new(
        directory: Arc<dyn ParticipantDirectory>,
        store: Arc<dyn MessageStore>,
        pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            directory,
            store,
            pusher,
        }
    }

    /// 履歴再送を実行
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - 要求元の接続へ再送したイベント数
    /// * `Err(FetchHistoryError)` - 認可またはストア読み出しの失敗
    pub async fn execute(
        &self,
        connection_id: &ConnectionId,
        user_id: &UserId,
        room_id: RoomId,
        since: Sequence,
    ) -> Result<usize, FetchHistoryError> {
        if !self.directory.is_participant(user_id, &room_id).await {
            return Err(FetchHistoryError::Unauthorized(AuthorizationError {
                user_id: user_id.as_str().to_string(),
                room_id: room_id.as_str().to_string(),
            }));
        }

        let events = self.store.fetch_since(&room_id, since).await?;
        let total = events.len();

        let mut replayed = 0;
        for event in &events {
            let json = ServerEvent::from(event).to_json();
            if let Err(e) = self.pusher.push_to(connection_id, &json).await {
                // 要求元が再送中に切断した。残りは次回の再接続で埋まる
                tracing::debug!(
                    "Stopped history replay to '{}' after {}/{} event(s): {}",
                    connection_id.as_str(),
                    replayed,
                    total,
                    e
                );
                break;
            }
            replayed += 1;
        }

        tracing::debug!(
            "Replayed {} event(s) of room '{}' since sequence {} to '{}'",
            replayed,
            room_id.as_str(),
            since.value(),
            connection_id.as_str()
        );
        Ok(replayed)
    }
}
