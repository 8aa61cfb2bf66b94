//! UseCase: ルーム参加処理
//!
//! 参加者ディレクトリで認可を確認した上で、(接続, ルーム) のメンバーシップを
//! 記録し、現在のメンバーのユーザー一覧（「誰がいるか」の表示用）を返す。
//! join は冪等で、再接続後の再 join も同じ経路を通る。
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - JoinRoomUseCase::execute() メソッド
//!
//! ### なぜこのテストが必要か
//! - 非参加者の join が状態を一切変更せずに拒否されることを保証
//! - メンバー一覧が接続ではなくユーザー単位で返ることを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系: 参加者の join、二重 join
//! - 異常系: 非参加者の join

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::domain::{
    AuthorizationError, ConnectionId, ConnectionRegistry, ParticipantDirectory, RoomId,
    RoomMembership, UserId,
};

use super::error::JoinRoomError;

/// ルーム参加のユースケース
pub struct JoinRoomUseCase {
    /// 参加者ディレクトリ（認可の抽象化）
    directory: Arc<dyn ParticipantDirectory>,
    /// ルームメンバーシップ（共有状態）
    membership: Arc<Mutex<RoomMembership>>,
    /// 接続レジストリ（メンバー一覧のユーザー解決に使う）
    registry: Arc<Mutex<ConnectionRegistry>>,
}

impl JoinRoomUseCase {
    /// 新しい JoinRoomUseCase を作成
    pub fn new(
        directory: Arc<dyn ParticipantDirectory>,
        membership: Arc<Mutex<RoomMembership>>,
        registry: Arc<Mutex<ConnectionRegistry>>,
    ) -> Self {
        Self {
            directory,
            membership,
            registry,
        }
    }

    /// ルーム参加を実行
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<UserId>)` - 参加後の現在のメンバーのユーザー一覧（ID 順）
    /// * `Err(JoinRoomError)` - 認可の失敗（メンバーシップは未変更）
    pub async fn execute(
        &self,
        connection_id: ConnectionId,
        user_id: &UserId,
        room_id: RoomId,
    ) -> Result<Vec<UserId>, JoinRoomError> {
        if !self.directory.is_participant(user_id, &room_id).await {
            return Err(JoinRoomError::Unauthorized(AuthorizationError {
                user_id: user_id.as_str().to_string(),
                room_id: room_id.as_str().to_string(),
            }));
        }

        {
            let mut membership = self.membership.lock().await;
            membership.join(connection_id, room_id.clone());
        }
        tracing::debug!(
            "User '{}' joined room '{}'",
            user_id.as_str(),
            room_id.as_str()
        );

        Ok(self.member_users(&room_id).await)
    }

    /// ルームの現在のメンバーをユーザー単位で列挙する（ID 順、重複なし）
    async fn member_users(&self, room_id: &RoomId) -> Vec<UserId> {
        let members = {
            let membership = self.membership.lock().await;
            membership.members_of(room_id)
        };
        let registry = self.registry.lock().await;
        let mut users: Vec<UserId> = members
            .iter()
            .filter_map(|connection_id| registry.owner_of(connection_id).cloned())
            .collect();
        users.sort();
        users.dedup();
        users
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Timestamp;
    use crate::infrastructure::directory::InMemoryParticipantDirectory;

    fn user(id: &str) -> UserId {
        UserId::new(id.to_string()).unwrap()
    }

    fn conn(id: &str) -> ConnectionId {
        ConnectionId::new(id.to_string()).unwrap()
    }

    fn room(id: &str) -> RoomId {
        RoomId::new(id.to_string()).unwrap()
    }

    struct Fixture {
        usecase: JoinRoomUseCase,
        registry: Arc<Mutex<ConnectionRegistry>>,
        membership: Arc<Mutex<RoomMembership>>,
        directory: Arc<InMemoryParticipantDirectory>,
    }

    fn create_fixture() -> Fixture {
        let registry = Arc::new(Mutex::new(ConnectionRegistry::new()));
        let membership = Arc::new(Mutex::new(RoomMembership::new()));
        let directory = Arc::new(InMemoryParticipantDirectory::new());
        let usecase =
            JoinRoomUseCase::new(directory.clone(), membership.clone(), registry.clone());
        Fixture {
            usecase,
            registry,
            membership,
            directory,
        }
    }

    #[tokio::test]
    async fn test_participant_can_join() {
        // テスト項目: 参加者の join が受理され、メンバー一覧に自分が含まれる
        // given (前提条件):
        let fixture = create_fixture();
        fixture.directory.grant(room("r1"), user("alice")).await;
        {
            let mut registry = fixture.registry.lock().await;
            registry.register(user("alice"), conn("c1"), Timestamp::new(1000));
        }

        // when (操作):
        let result = fixture
            .usecase
            .execute(conn("c1"), &user("alice"), room("r1"))
            .await;

        // then (期待する結果):
        assert_eq!(result, Ok(vec![user("alice")]));
        let membership = fixture.membership.lock().await;
        assert!(membership.is_member(&conn("c1"), &room("r1")));
    }

    #[tokio::test]
    async fn test_non_participant_join_is_refused() {
        // テスト項目: 非参加者の join が拒否され、メンバーシップは変更されない
        // given (前提条件):
        let fixture = create_fixture();
        fixture.directory.grant(room("r1"), user("alice")).await;

        // when (操作):
        let result = fixture
            .usecase
            .execute(conn("c9"), &user("mallory"), room("r1"))
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(JoinRoomError::Unauthorized(_))));
        let membership = fixture.membership.lock().await;
        assert!(membership.members_of(&room("r1")).is_empty());
    }

    #[tokio::test]
    async fn test_join_is_idempotent() {
        // テスト項目: 二重 join でもメンバー一覧は重複しない
        // given (前提条件):
        let fixture = create_fixture();
        fixture.directory.grant(room("r1"), user("alice")).await;
        {
            let mut registry = fixture.registry.lock().await;
            registry.register(user("alice"), conn("c1"), Timestamp::new(1000));
        }

        // when (操作):
        fixture
            .usecase
            .execute(conn("c1"), &user("alice"), room("r1"))
            .await
            .unwrap();
        let members = fixture
            .usecase
            .execute(conn("c1"), &user("alice"), room("r1"))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(members, vec![user("alice")]);
        let membership = fixture.membership.lock().await;
        assert_eq!(membership.members_of(&room("r1")).len(), 1);
    }

    #[tokio::test]
    async fn test_member_list_is_per_user_and_sorted() {
        // テスト項目: メンバー一覧が接続ではなくユーザー単位で、ID 順に返される
        // given (前提条件):
        let fixture = create_fixture();
        for name in ["alice", "bob"] {
            fixture.directory.grant(room("r1"), user(name)).await;
        }
        {
            let mut registry = fixture.registry.lock().await;
            // bob は 2 本の接続で参加する
            registry.register(user("bob"), conn("c1"), Timestamp::new(1000));
            registry.register(user("bob"), conn("c2"), Timestamp::new(1000));
            registry.register(user("alice"), conn("c3"), Timestamp::new(1000));
        }
        fixture
            .usecase
            .execute(conn("c1"), &user("bob"), room("r1"))
            .await
            .unwrap();
        fixture
            .usecase
            .execute(conn("c2"), &user("bob"), room("r1"))
            .await
            .unwrap();

        // when (操作):
        let members = fixture
            .usecase
            .execute(conn("c3"), &user("alice"), room("r1"))
            .await
            .unwrap();

        // then (期待する結果): bob の 2 接続は 1 ユーザーにまとめられる
        assert_eq!(members, vec![user("alice"), user("bob")]);
    }
}
