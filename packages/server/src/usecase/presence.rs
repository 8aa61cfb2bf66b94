//! UseCase: プレゼンス追跡
//!
//! 接続レジストリの遷移からユーザーごとのオンライン / オフライン状態を導出し、
//! 確定した遷移だけを presence_changed イベントとして全生存接続へ配信する。
//!
//! オフラインへの遷移は猶予期間（デバウンス）を挟む。タブのリロードや
//! 一瞬のネットワーク断でプレゼンスが明滅しないよう、最後の接続が切れても
//! すぐにはオフラインを確定せず、猶予期間が明けた時点でまだ接続が無い場合に
//! のみ確定する。コストは猶予期間ぶんの報告遅延に限られる。
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - PresenceTracker の on_connection_registered / on_connection_deregistered
//! - 猶予期間まわりのデバウンス挙動
//!
//! ### なぜこのテストが必要か
//! - マルチデバイス時の誤オフライン通知を防ぐ（1 本残っていればオンライン）
//! - 猶予期間内の再接続でオフライン通知が出ないことを保証
//! - 真の切断では exactly-one のオフライン通知を保証
//!
//! ### どのような状況を想定しているか
//! - 正常系: 初回接続のオンライン通知、猶予期間明けのオフライン通知
//! - エッジケース: 複数接続のうち 1 本だけの切断、猶予期間中の再接続

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::domain::{ConnectionRegistry, MessagePusher, Presence, PresenceLedger, Timestamp, UserId};
use crate::infrastructure::dto::conversion::presence_changed_event;
use tsunagi_shared::time::get_utc_timestamp;

/// プレゼンス追跡のユースケース
pub struct PresenceTracker {
    /// 接続レジストリ（共有状態）
    registry: Arc<Mutex<ConnectionRegistry>>,
    /// 確定済みプレゼンスの台帳
    ledger: Arc<Mutex<PresenceLedger>>,
    /// MessagePusher（イベント配信の抽象化）
    pusher: Arc<dyn MessagePusher>,
    /// オフライン確定までの猶予期間
    grace_period: Duration,
}

impl PresenceTracker {
    /// 新しい PresenceTracker を作成
    pub fn new(
        registry: Arc<Mutex<ConnectionRegistry>>,
        pusher: Arc<dyn MessagePusher>,
        grace_period: Duration,
    ) -> Self {
        Self {
            registry,
            ledger: Arc::new(Mutex::new(PresenceLedger::new())),
            pusher,
            grace_period,
        }
    }

    /// 接続登録の通知を受ける
    ///
    /// ユーザーの最初の接続であればオンラインへ遷移し、presence_changed を
    /// 全生存接続へ配信する。既にオンラインの場合は外から見える変化はない。
    pub async fn on_connection_registered(&self, user_id: &UserId) {
        let now = Timestamp::new(get_utc_timestamp());
        let transitioned = {
            let mut ledger = self.ledger.lock().await;
            ledger.note_connected(user_id, now)
        };
        if transitioned {
            tracing::info!("User '{}' is now online", user_id.as_str());
            broadcast_presence(&self.registry, &self.ledger, self.pusher.as_ref(), user_id).await;
        }
    }

    /// 接続解除の通知を受ける
    ///
    /// まだ生存接続が残っていれば何もしない。最後の接続だった場合は
    /// 猶予期間後のオフライン確定チェックを予約する。猶予期間中に
    /// 再接続があると台帳の世代が進み、予約は発火しても no-op になる。
    pub async fn on_connection_deregistered(&self, user_id: &UserId) {
        {
            let registry = self.registry.lock().await;
            if registry.is_online(user_id) {
                return;
            }
        }

        let ticket = {
            let mut ledger = self.ledger.lock().await;
            ledger.note_disconnected(user_id)
        };

        let registry = Arc::clone(&self.registry);
        let ledger = Arc::clone(&self.ledger);
        let pusher = Arc::clone(&self.pusher);
        let grace_period = self.grace_period;
        let user_id = user_id.clone();

        tokio::spawn(async move {
            tokio::time::sleep(grace_period).await;

            {
                let registry = registry.lock().await;
                if registry.is_online(&user_id) {
                    return;
                }
            }

            let committed = {
                let mut ledger = ledger.lock().await;
                ledger.try_commit_offline(&user_id, ticket, Timestamp::new(get_utc_timestamp()))
            };
            if committed {
                tracing::info!("User '{}' is now offline", user_id.as_str());
                broadcast_presence(&registry, &ledger, pusher.as_ref(), &user_id).await;
            }
        });
    }

    /// 確定済みプレゼンスを返す
    ///
    /// 猶予期間中のユーザーはまだオンラインとして報告される。
    pub async fn current_presence(&self, user_id: &UserId) -> Presence {
        let ledger = self.ledger.lock().await;
        ledger.current(user_id)
    }

    /// 確定済み状態を持つ全ユーザーのスナップショット（ID 順）
    pub async fn snapshot(&self) -> Vec<(UserId, Presence)> {
        let ledger = self.ledger.lock().await;
        ledger.snapshot()
    }
}

/// 確定済みプレゼンスを全生存接続へ配信する
async fn broadcast_presence(
    registry: &Mutex<ConnectionRegistry>,
    ledger: &Mutex<PresenceLedger>,
    pusher: &dyn MessagePusher,
    user_id: &UserId,
) {
    let presence = {
        let ledger = ledger.lock().await;
        ledger.current(user_id)
    };
    let targets = {
        let registry = registry.lock().await;
        registry.all_connections()
    };
    let event = presence_changed_event(user_id, &presence);
    pusher.broadcast(&targets, &event.to_json()).await;
}
