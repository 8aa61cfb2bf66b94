//! 通知ディスパッチの実装
//!
//! ## 概要
//!
//! このモジュールは `NotificationDispatcher` trait の具体的な実装を提供します。
//!
//! ## 実装
//!
//! - `LoggingNotificationDispatcher`: 通知インテントをログに残すだけの実装。
//!   プッシュ配信そのものは外部サービスの責務で、このコアは発行までを担う
//! - 将来的に: FCM / APNs ゲートウェイへの HTTP 実装

use async_trait::async_trait;

use crate::domain::{MessageEvent, NotificationDispatcher, UserId};

/// 通知インテントをログへ記録するディスパッチャ
pub struct LoggingNotificationDispatcher;

#[async_trait]
impl NotificationDispatcher for LoggingNotificationDispatcher {
    async fn notify(&self, user_id: &UserId, event: &MessageEvent) {
        tracing::info!(
            "Notification intent for offline user '{}': message '{}' in room '{}'",
            user_id.as_str(),
            event.id.as_str(),
            event.room_id.as_str()
        );
    }
}
