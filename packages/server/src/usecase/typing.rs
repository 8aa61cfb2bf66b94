//! UseCase: タイピング調停
//!
//! ルームにスコープした「入力中」シグナルの短命・ベストエフォート配信。
//! 永続化も ACK も再送も行わない、純粋な表示用のストリーム。
//!
//! 受信側に「入力中」が固着しないことが唯一の保証で、明示的な stop が
//! 来なくても期限切れウィンドウの経過後にコーディネータ自身が stop を
//! 合成して配信する。start の refresh は台帳の世代を進めるため、
//! 古い期限切れタイマーが発火しても no-op になる。
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - TypingCoordinator の start / stop / 期限切れによる stop 合成
//!
//! ### なぜこのテストが必要か
//! - 受信側が「入力中」のまま取り残されないことを保証
//! - 期限切れ後の stop 合成が exactly-one であることを保証
//! - refresh による期限の延長が機能することを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系: start → 配信、stop → 配信
//! - 異常系: stop が来ないまま期限切れ
//! - エッジケース: refresh 後の旧タイマー発火、送信者自身の接続の除外

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::domain::{
    ConnectionId, ConnectionRegistry, MessagePusher, ParticipantDirectory, RoomId, RoomMembership,
    TypingLedger, UserId,
};
use crate::infrastructure::dto::websocket::ServerEvent;

/// タイピング調停のユースケース
pub struct TypingCoordinator {
    /// タイピング台帳
    ledger: Arc<Mutex<TypingLedger>>,
    /// 接続レジストリ（送信者自身の接続の除外に使う）
    registry: Arc<Mutex<ConnectionRegistry>>,
    /// ルームメンバーシップ（ファンアウト対象の決定に使う）
    membership: Arc<Mutex<RoomMembership>>,
    /// 参加者ディレクトリ（認可の抽象化）
    directory: Arc<dyn ParticipantDirectory>,
    /// MessagePusher（イベント配信の抽象化）
    pusher: Arc<dyn MessagePusher>,
    /// シグナルの期限切れウィンドウ
    expiry_window: Duration,
}

impl TypingCoordinator {
    /// 新しい TypingCoordinator を作成
    pub fn new(
        registry: Arc<Mutex<ConnectionRegistry>>,
        membership: Arc<Mutex<RoomMembership>>,
        directory: Arc<dyn ParticipantDirectory>,
        pusher: Arc<dyn MessagePusher>,
        expiry_window: Duration,
    ) -> Self {
        Self {
            ledger: Arc::new(Mutex::new(TypingLedger::new())),
            registry,
            membership,
            directory,
            pusher,
            expiry_window,
        }
    }

    /// 入力中シグナルを開始（または refresh）する
    ///
    /// ルームの参加者でないユーザーのシグナルは黙って捨てる
    /// （表示用ストリームなのでエラーは返さない）。
    pub async fn start(&self, user_id: &UserId, room_id: &RoomId) {
        if !self.directory.is_participant(user_id, room_id).await {
            tracing::debug!(
                "Dropping typing signal from non-participant '{}' for room '{}'",
                user_id.as_str(),
                room_id.as_str()
            );
            return;
        }

        let ticket = {
            let mut ledger = self.ledger.lock().await;
            ledger.start(room_id.clone(), user_id.clone())
        };

        broadcast_typing(
            &self.registry,
            &self.membership,
            self.pusher.as_ref(),
            room_id,
            user_id,
            true,
        )
        .await;

        // 期限切れタイマー。refresh や stop で世代が進むと発火しても no-op になる
        let ledger = Arc::clone(&self.ledger);
        let registry = Arc::clone(&self.registry);
        let membership = Arc::clone(&self.membership);
        let pusher = Arc::clone(&self.pusher);
        let expiry_window = self.expiry_window;
        let room_id = room_id.clone();
        let user_id = user_id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(expiry_window).await;
            let expired = {
                let mut ledger = ledger.lock().await;
                ledger.expire(&room_id, &user_id, ticket)
            };
            if expired {
                broadcast_typing(
                    &registry,
                    &membership,
                    pusher.as_ref(),
                    &room_id,
                    &user_id,
                    false,
                )
                .await;
            }
        });
    }

    /// 入力中シグナルを明示的に解除する
    ///
    /// シグナルが存在した場合にのみ stop を配信する（重複 stop の抑制）。
    /// メッセージ送信時の早期解除もこの経路を使う。
    pub async fn stop(&self, user_id: &UserId, room_id: &RoomId) {
        let removed = {
            let mut ledger = self.ledger.lock().await;
            ledger.stop(room_id, user_id)
        };
        if removed {
            broadcast_typing(
                &self.registry,
                &self.membership,
                self.pusher.as_ref(),
                room_id,
                user_id,
                false,
            )
            .await;
        }
    }

    /// ルームで入力中のユーザーのスナップショット
    pub async fn typing_in(&self, room_id: &RoomId) -> Vec<UserId> {
        let ledger = self.ledger.lock().await;
        ledger.typing_in(room_id)
    }
}

/// 入力中シグナルを、送信者自身の接続を除くルームメンバーへ配信する
async fn broadcast_typing(
    registry: &Mutex<ConnectionRegistry>,
    membership: &Mutex<RoomMembership>,
    pusher: &dyn MessagePusher,
    room_id: &RoomId,
    user_id: &UserId,
    is_typing: bool,
) {
    let members = {
        let membership = membership.lock().await;
        membership.members_of(room_id)
    };
    let own_connections: HashSet<ConnectionId> = {
        let registry = registry.lock().await;
        registry.connections_for(user_id).into_iter().collect()
    };
    let targets: Vec<ConnectionId> = members
        .into_iter()
        .filter(|connection_id| !own_connections.contains(connection_id))
        .collect();

    let event = ServerEvent::Typing {
        room_id: room_id.as_str().to_string(),
        user_id: user_id.as_str().to_string(),
        is_typing,
    };
    pusher.broadcast(&targets, &event.to_json()).await;
}
