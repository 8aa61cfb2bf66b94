//! UseCase: 接続解除処理
//!
//! トランスポートの切断・タイムアウトを受けて、接続をレジストリから外し、
//! 全ルームのメンバーシップをカスケードで取り除き、プレゼンスに
//! 「オフラインかもしれない」を通知する。
//!
//! 切断イベントは二重に届くことがある（トランスポートの close とタイムアウトの
//! 競合など）。未知の接続の解除は no-op で、決してエラーにしない。
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DisconnectUseCase::execute() メソッド
//!
//! ### なぜこのテストが必要か
//! - 切断時のカスケード（レジストリ・メンバーシップ・プッシャー）を保証
//! - 二重切断がクラッシュや二重通知にならないことを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系: 参加中のルームを持つ接続の切断
//! - エッジケース: 未知の接続の切断、二重切断

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::domain::{ConnectionId, ConnectionRegistry, MessagePusher, RoomMembership};

use super::presence::PresenceTracker;

/// 接続解除のユースケース
pub struct DisconnectUseCase {
    /// 接続レジストリ（共有状態）
    registry: Arc<Mutex<ConnectionRegistry>>,
    /// ルームメンバーシップ（共有状態）
    membership: Arc<Mutex<RoomMembership>>,
    /// MessagePusher（イベント配信の抽象化）
    pusher: Arc<dyn MessagePusher>,
    /// PresenceTracker（プレゼンス遷移の通知先）
    presence_tracker: Arc<PresenceTracker>,
}

impl DisconnectUseCase {
    /// 新しい DisconnectUseCase を作成
    pub fn new(
        registry: Arc<Mutex<ConnectionRegistry>>,
        membership: Arc<Mutex<RoomMembership>>,
        pusher: Arc<dyn MessagePusher>,
        presence_tracker: Arc<PresenceTracker>,
    ) -> Self {
        Self {
            registry,
            membership,
            pusher,
            presence_tracker,
        }
    }

    /// 接続解除を実行
    ///
    /// 未知の接続 ID は no-op。エラーを返すことはない。
    pub async fn execute(&self, connection_id: &ConnectionId) {
        let outcome = {
            let mut registry = self.registry.lock().await;
            registry.deregister(connection_id)
        };

        let left_rooms = {
            let mut membership = self.membership.lock().await;
            membership.leave_all(connection_id)
        };

        self.pusher.unregister_connection(connection_id).await;

        match outcome {
            Some(outcome) => {
                tracing::info!(
                    "Connection '{}' of user '{}' deregistered (left {} room(s))",
                    connection_id.as_str(),
                    outcome.user_id.as_str(),
                    left_rooms.len()
                );
                self.presence_tracker
                    .on_connection_deregistered(&outcome.user_id)
                    .await;
            }
            None => {
                tracing::debug!(
                    "Connection '{}' was already deregistered, ignoring",
                    connection_id.as_str()
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RoomId, Timestamp, UserId};
    use crate::usecase::test_support::CapturingPusher;
    use std::time::Duration;

    fn user(id: &str) -> UserId {
        UserId::new(id.to_string()).unwrap()
    }

    fn conn(id: &str) -> ConnectionId {
        ConnectionId::new(id.to_string()).unwrap()
    }

    fn room(id: &str) -> RoomId {
        RoomId::new(id.to_string()).unwrap()
    }

    fn create_usecase() -> (
        DisconnectUseCase,
        Arc<Mutex<ConnectionRegistry>>,
        Arc<Mutex<RoomMembership>>,
    ) {
        let registry = Arc::new(Mutex::new(ConnectionRegistry::new()));
        let membership = Arc::new(Mutex::new(RoomMembership::new()));
        let pusher = CapturingPusher::new();
        let presence_tracker = Arc::new(PresenceTracker::new(
            registry.clone(),
            pusher.clone(),
            Duration::from_secs(10),
        ));
        let usecase = DisconnectUseCase::new(
            registry.clone(),
            membership.clone(),
            pusher,
            presence_tracker,
        );
        (usecase, registry, membership)
    }

    #[tokio::test]
    async fn test_disconnect_cascades_membership() {
        // テスト項目: 切断すると全ルームのメンバーシップから接続が外れる
        // given (前提条件):
        let (usecase, registry, membership) = create_usecase();
        {
            let mut registry = registry.lock().await;
            registry.register(user("alice"), conn("c1"), Timestamp::new(1000));
        }
        {
            let mut membership = membership.lock().await;
            membership.join(conn("c1"), room("r1"));
            membership.join(conn("c1"), room("r2"));
        }

        // when (操作):
        usecase.execute(&conn("c1")).await;

        // then (期待する結果):
        let registry = registry.lock().await;
        assert!(!registry.is_online(&user("alice")));
        let membership = membership.lock().await;
        assert!(membership.members_of(&room("r1")).is_empty());
        assert!(membership.members_of(&room("r2")).is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_unknown_connection_is_noop() {
        // テスト項目: 未知の接続の切断はクラッシュせず no-op として処理される
        // given (前提条件):
        let (usecase, registry, _membership) = create_usecase();

        // when (操作):
        usecase.execute(&conn("unknown")).await;

        // then (期待する結果):
        let registry = registry.lock().await;
        assert_eq!(registry.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_double_disconnect_is_noop() {
        // テスト項目: 二重切断でも 2 回目は no-op になる（冪等性）
        // given (前提条件):
        let (usecase, registry, _membership) = create_usecase();
        {
            let mut registry = registry.lock().await;
            registry.register(user("alice"), conn("c1"), Timestamp::new(1000));
        }

        // when (操作):
        usecase.execute(&conn("c1")).await;
        usecase.execute(&conn("c1")).await;

        // then (期待する結果):
        let registry = registry.lock().await;
        assert_eq!(registry.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_disconnect_keeps_other_connections_of_same_user() {
        // テスト項目: 同一ユーザーの他の接続は切断の影響を受けない
        // given (前提条件):
        let (usecase, registry, membership) = create_usecase();
        {
            let mut registry = registry.lock().await;
            registry.register(user("alice"), conn("c1"), Timestamp::new(1000));
            registry.register(user("alice"), conn("c2"), Timestamp::new(1000));
        }
        {
            let mut membership = membership.lock().await;
            membership.join(conn("c1"), room("r1"));
            membership.join(conn("c2"), room("r1"));
        }

        // when (操作): c1 だけを切断
        usecase.execute(&conn("c1")).await;

        // then (期待する結果): c2 はオンラインのままルームにも残る
        let registry = registry.lock().await;
        assert!(registry.is_online(&user("alice")));
        let membership = membership.lock().await;
        assert_eq!(membership.members_of(&room("r1")), vec![conn("c2")]);
    }
}
