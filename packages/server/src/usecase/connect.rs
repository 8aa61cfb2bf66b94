//! UseCase: 接続確立処理
//!
//! ハンドシェイクのトークンを検証し、接続をレジストリと MessagePusher に
//! 登録する。検証に失敗した接続はレジストリに入る前に拒否される。
//!
//! 同じ接続 ID での再登録は置き換えとして扱い（重複ハンドシェイクのレース）、
//! 同一ユーザーの複数接続（複数タブ・複数デバイス）はそのまま共存する。
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectUseCase::execute() メソッド
//!
//! ### なぜこのテストが必要か
//! - 認証失敗時にレジストリが汚れないことを保証
//! - 登録成功時にレジストリ・プッシャー・プレゼンスが揃って更新されることを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系: 新規接続、同一ユーザーの追加接続
//! - 異常系: 無効なトークン

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::domain::{
    ConnectionId, ConnectionRegistry, IdentityVerifier, MessagePusher, Presence, PusherChannel,
    Timestamp, UserId,
};
use tsunagi_shared::time::get_utc_timestamp;

use super::error::ConnectError;
use super::presence::PresenceTracker;

/// 接続確立のユースケース
pub struct ConnectUseCase {
    /// IdentityVerifier（身元検証の抽象化）
    verifier: Arc<dyn IdentityVerifier>,
    /// 接続レジストリ（共有状態）
    registry: Arc<Mutex<ConnectionRegistry>>,
    /// MessagePusher（イベント配信の抽象化）
    pusher: Arc<dyn MessagePusher>,
    /// PresenceTracker（プレゼンス遷移の通知先）
    presence_tracker: Arc<PresenceTracker>,
}

impl ConnectUseCase {
    /// 新しい ConnectUseCase を作成
    pub fn new(
        verifier: Arc<dyn IdentityVerifier>,
        registry: Arc<Mutex<ConnectionRegistry>>,
        pusher: Arc<dyn MessagePusher>,
        presence_tracker: Arc<PresenceTracker>,
    ) -> Self {
        Self {
            verifier,
            registry,
            pusher,
            presence_tracker,
        }
    }

    /// 接続確立を実行
    ///
    /// # Arguments
    ///
    /// * `token` - ハンドシェイクで提示されたトークン
    /// * `connection_id` - この接続に採番された ID
    /// * `sender` - この接続への送信チャンネル
    ///
    /// # Returns
    ///
    /// * `Ok((UserId, Timestamp))` - 確立したユーザーと接続時刻
    /// * `Err(ConnectError)` - 身元を確立できなかった（レジストリは未変更）
    pub async fn execute(
        &self,
        token: &str,
        connection_id: ConnectionId,
        sender: PusherChannel,
    ) -> Result<(UserId, Timestamp), ConnectError> {
        // 1. 身元検証（失敗したらレジストリには一切触れない）
        let user_id = self.verifier.verify(token).await?;

        // 2. レジストリへ登録
        let connected_at = Timestamp::new(get_utc_timestamp());
        {
            let mut registry = self.registry.lock().await;
            registry.register(user_id.clone(), connection_id.clone(), connected_at);
        }

        // 3. MessagePusher に送信チャンネルを登録
        self.pusher.register_connection(connection_id, sender).await;

        // 4. プレゼンスへ遷移を通知（初回接続ならオンライン配信が走る）
        self.presence_tracker
            .on_connection_registered(&user_id)
            .await;

        Ok((user_id, connected_at))
    }

    /// 確定済みプレゼンスのスナップショットを返す
    ///
    /// 新規接続に現在のオンライン状況を流し込むために使う。
    pub async fn presence_snapshot(&self) -> Vec<(UserId, Presence)> {
        self.presence_tracker.snapshot().await
    }

    /// 接続の最終アクティビティ時刻を更新する
    pub async fn touch(&self, connection_id: &ConnectionId) {
        let mut registry = self.registry.lock().await;
        registry.touch(connection_id, Timestamp::new(get_utc_timestamp()));
    }
}
