//! 通知ディスパッチの trait 定義
//!
//! 生存接続を 1 本も持たない参加者へのメッセージ通知は、ソケット配信の
//! 代わりに外部のプッシュ通知コラボレータへ委譲する。fire-and-forget で、
//! 失敗しても送信操作の成否には影響しない。

use async_trait::async_trait;

use super::entity::MessageEvent;
use super::value_object::UserId;

/// プッシュ通知コラボレータへのインターフェース
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// オフライン参加者への通知インテントを発行する（fire-and-forget）
    async fn notify(&self, user_id: &UserId, event: &MessageEvent);
}
