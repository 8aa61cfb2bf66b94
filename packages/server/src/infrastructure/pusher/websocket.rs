//! WebSocket を使った MessagePusher 実装
//!
//! ## 責務
//!
//! - 接続 ID ごとの `UnboundedSender` の管理
//! - 接続へのイベント送信（push_to, broadcast）
//!
//! ## 設計ノート
//!
//! WebSocket の生成と upgrade は UI 層（`ui/handler/websocket.rs`）で行われます。
//! この実装は生成された送信チャンネルを受け取り、イベント送信に使用します。
//!
//! ファンアウト先の接続が同時に切断されるレース（stale membership）は想定内で、
//! 見つからない・送れない接続は警告ログを残してスキップします。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{ConnectionId, MessagePushError, MessagePusher, PusherChannel};

/// WebSocket を使った MessagePusher 実装
pub struct WebSocketMessagePusher {
    /// 接続中の送信チャンネル
    ///
    /// Key: ConnectionId
    /// Value: PusherChannel
    connections: Mutex<HashMap<ConnectionId, PusherChannel>>,
}

impl WebSocketMessagePusher {
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for WebSocketMessagePusher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessagePusher for WebSocketMessagePusher {
    async fn register_connection(&self, connection_id: ConnectionId, sender: PusherChannel) {
        let mut connections = self.connections.lock().await;
        connections.insert(connection_id.clone(), sender);
        tracing::debug!(
            "Connection '{}' registered to MessagePusher",
            connection_id.as_str()
        );
    }

    async fn unregister_connection(&self, connection_id: &ConnectionId) {
        let mut connections = self.connections.lock().await;
        connections.remove(connection_id);
        tracing::debug!(
            "Connection '{}' unregistered from MessagePusher",
            connection_id.as_str()
        );
    }

    async fn push_to(
        &self,
        connection_id: &ConnectionId,
        content: &str,
    ) -> Result<(), MessagePushError> {
        let connections = self.connections.lock().await;

        let sender = connections.get(connection_id).ok_or_else(|| {
            MessagePushError::ConnectionNotFound(connection_id.as_str().to_string())
        })?;
        sender.send(content.to_string()).map_err(|e| {
            MessagePushError::PushFailed(connection_id.as_str().to_string(), e.to_string())
        })?;
        Ok(())
    }

    async fn broadcast(&self, targets: &[ConnectionId], content: &str) -> usize {
        let connections = self.connections.lock().await;

        let mut delivered = 0;
        for target in targets {
            match connections.get(target) {
                Some(sender) => {
                    // ファンアウトでは個々の送信失敗を許容する
                    if let Err(e) = sender.send(content.to_string()) {
                        tracing::warn!(
                            "Failed to push event to connection '{}': {}",
                            target.as_str(),
                            e
                        );
                    } else {
                        delivered += 1;
                    }
                }
                None => {
                    // 既に切断済みの接続への配信。エラーにはしない
                    tracing::debug!(
                        "Connection '{}' not found during broadcast, skipping",
                        target.as_str()
                    );
                }
            }
        }

        delivered
    }
}
