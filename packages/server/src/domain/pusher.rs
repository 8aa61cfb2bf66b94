//! メッセージ配信（プッシュ）の trait 定義
//!
//! 接続ごとの送信チャンネルを管理し、シリアライズ済みイベントを
//! トランスポートへ流すためのインターフェース。具体的な実装
//! （WebSocket など）は Infrastructure 層が提供します。

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use super::value_object::ConnectionId;

/// 接続ごとの送信チャンネル
pub type PusherChannel = mpsc::UnboundedSender<String>;

/// 単一接続への配信失敗
///
/// ファンアウト中の 1 接続への失敗は致命ではない。ログに残して握りつぶし、
/// 他の受信者にも送信者の成功応答にも影響させない。
#[derive(Debug, Error)]
pub enum MessagePushError {
    /// 接続が登録されていない（既に切断済みのレースを含む）
    #[error("connection '{0}' is not registered")]
    ConnectionNotFound(String),

    /// 送信チャンネルへの書き込みに失敗した
    #[error("failed to push to connection '{0}': {1}")]
    PushFailed(String, String),
}

/// トランスポートへのイベント配信のインターフェース
#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// 接続の送信チャンネルを登録する
    async fn register_connection(&self, connection_id: ConnectionId, sender: PusherChannel);

    /// 接続の送信チャンネルを登録解除する（未知の ID は no-op）
    async fn unregister_connection(&self, connection_id: &ConnectionId);

    /// 特定の接続へイベントを送る
    async fn push_to(
        &self,
        connection_id: &ConnectionId,
        content: &str,
    ) -> Result<(), MessagePushError>;

    /// 複数の接続へイベントをばらまく
    ///
    /// 個々の失敗は握りつぶし、実際に送信できた接続数を返す。
    async fn broadcast(&self, targets: &[ConnectionId], content: &str) -> usize;
}
