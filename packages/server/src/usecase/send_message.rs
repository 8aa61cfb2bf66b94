//! UseCase: メッセージ送信（ディスパッチ）処理
//!
//! プロトコルのコア。1 回の送信は次の状態を辿る:
//!
//! 1. **Received**: 認証済み接続が {roomId, correlationId, content} を提出する
//! 2. **Authorized**: 参加者ディレクトリで送信者を検証。失敗は終端で、
//!    何も永続化されず何も配信されない
//! 3. **Persisted**: メッセージストアへ委譲して追記し、採番済みの確定
//!    イベントを得る。失敗は終端で、送信者にのみ報告。部分配信は起きない
//!    （コミットされていないものは決してファンアウトしない）
//! 4. **Delivered**: 配信時点のルームメンバー全接続へファンアウトする。
//!    個々の配信はベストエフォートで、1 接続の失敗は他に影響しない
//! 5. **Notified**: 生存接続が 0 本の参加者には、ソケット配信の代わりに
//!    通知コラボレータへインテントを発行する
//!
//! ルーム内の配信順はストアの採番順と一致させる。追記とファンアウトを
//! ディスパッチガードで直列化し、並行送信でも採番順のままメンバーへ届く。
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendMessageUseCase::execute() の状態機械
//!
//! ### なぜこのテストが必要か
//! - 「永続化されていないものは配信されない」という at-most-once の土台を保証
//! - 配信対象の選定（参加表明済みの接続のみ、送信者 ACK、オフライン参加者への通知）
//! - ルーム内の配信順が採番順であることを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系: 送信 → 全メンバーへの配信と送信者 ACK
//! - 異常系: 非参加者の送信、永続化失敗
//! - エッジケース: 送信者がルーム未参加のまま送信、オフライン参加者のいるルーム

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::domain::{
    AuthorizationError, ConnectionId, ConnectionRegistry, CorrelationId, MessageContent,
    MessageEvent, MessagePusher, MessageStore, NotificationDispatcher, ParticipantDirectory,
    RoomId, RoomMembership, UserId,
};
use crate::infrastructure::dto::websocket::ServerEvent;

use super::error::SendMessageError;
use super::typing::TypingCoordinator;

/// メッセージ送信のユースケース
pub struct SendMessageUseCase {
    /// 参加者ディレクトリ（認可の抽象化）
    directory: Arc<dyn ParticipantDirectory>,
    /// メッセージストア（永続化の抽象化、順序の権威）
    store: Arc<dyn MessageStore>,
    /// 接続レジストリ（共有状態）
    registry: Arc<Mutex<ConnectionRegistry>>,
    /// ルームメンバーシップ（共有状態）
    membership: Arc<Mutex<RoomMembership>>,
    /// MessagePusher（イベント配信の抽象化）
    pusher: Arc<dyn MessagePusher>,
    /// NotificationDispatcher（オフライン通知の抽象化）
    notifier: Arc<dyn NotificationDispatcher>,
    /// TypingCoordinator（送信による入力中シグナルの早期解除）
    typing: Arc<TypingCoordinator>,
    /// 追記とファンアウトを直列化し、配信順を採番順に揃えるガード
    dispatch_guard: Mutex<()>,
}

impl SendMessageUseCase {
    /// 新しい SendMessageUseCase を作成
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        directory: Arc<dyn ParticipantDirectory>,
        store: Arc<dyn MessageStore>,
        registry: Arc<Mutex<ConnectionRegistry>>,
        membership: Arc<Mutex<RoomMembership>>,
        pusher: Arc<dyn MessagePusher>,
        notifier: Arc<dyn NotificationDispatcher>,
        typing: Arc<TypingCoordinator>,
    ) -> Self {
        Self {
            directory,
            store,
            registry,
            membership,
            pusher,
            notifier,
            typing,
            dispatch_guard: Mutex::new(()),
        }
    }

    /// メッセージ送信を実行
    ///
    /// # Arguments
    ///
    /// * `sender_connection_id` - 送信元の接続（ACK の宛先）
    /// * `sender_id` - 送信者（Domain Model）
    /// * `room_id` - 宛先ルーム（Domain Model）
    /// * `correlation_id` - クライアント採番の相関 ID
    /// * `content` - メッセージ本文（Domain Model）
    ///
    /// # Returns
    ///
    /// * `Ok(MessageEvent)` - 永続化が確定したイベント
    /// * `Err(SendMessageError)` - 認可または永続化の失敗（配信は行われない）
    pub async fn execute(
        &self,
        sender_connection_id: &ConnectionId,
        sender_id: UserId,
        room_id: RoomId,
        correlation_id: CorrelationId,
        content: MessageContent,
    ) -> Result<MessageEvent, SendMessageError> {
        // 1. 認可
        if !self.directory.is_participant(&sender_id, &room_id).await {
            return Err(SendMessageError::Unauthorized(AuthorizationError {
                user_id: sender_id.as_str().to_string(),
                room_id: room_id.as_str().to_string(),
            }));
        }

        // 2-4. 永続化とファンアウトをガード下で行う。
        //      並行送信でも配信順 = 採番順になる
        let event = {
            let _guard = self.dispatch_guard.lock().await;

            let event = self
                .store
                .append(
                    room_id.clone(),
                    sender_id.clone(),
                    content,
                    Some(correlation_id),
                )
                .await?;

            let json = ServerEvent::from(&event).to_json();
            let targets = {
                let membership = self.membership.lock().await;
                membership.members_of(&room_id)
            };
            let delivered = self.pusher.broadcast(&targets, &json).await;

            // 送信者 ACK: ルームに参加表明していない接続からの送信でも、
            // 確定イベントは送信元の接続に必ず返す（相関 ID の突き合わせ用）
            if !targets.contains(sender_connection_id) {
                if let Err(e) = self.pusher.push_to(sender_connection_id, &json).await {
                    tracing::debug!(
                        "Failed to ack sender connection '{}': {}",
                        sender_connection_id.as_str(),
                        e
                    );
                }
            }

            tracing::debug!(
                "Dispatched message '{}' to {} connection(s) in room '{}'",
                event.id.as_str(),
                delivered,
                room_id.as_str()
            );
            event
        };

        // メッセージ送信は入力中シグナルを早期解除する
        self.typing.stop(&sender_id, &room_id).await;

        // 5. 生存接続が 0 本の参加者への通知
        let offline_participants = self.offline_participants(&sender_id, &room_id).await;
        for participant in &offline_participants {
            self.notifier.notify(participant, &event).await;
        }

        Ok(event)
    }

    /// 送信者を除く、生存接続を 1 本も持たない参加者を列挙する
    async fn offline_participants(&self, sender_id: &UserId, room_id: &RoomId) -> Vec<UserId> {
        let participants = self.directory.participants_of(room_id).await;
        let registry = self.registry.lock().await;
        participants
            .into_iter()
            .filter(|participant| participant != sender_id && !registry.is_online(participant))
            .collect()
    }
}
