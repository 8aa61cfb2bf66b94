//! ユースケース層テスト用の共有テストダブル

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{ConnectionId, MessagePushError, MessagePusher, PusherChannel};
use crate::infrastructure::dto::websocket::ServerEvent;

/// 配信されたイベントを記録する MessagePusher
///
/// ファンアウトの対象と内容を後から検証するためのテストダブル。
/// 実際のチャンネルは持たず、全ての送信を成功として記録する。
#[derive(Default)]
pub struct CapturingPusher {
    sent: Mutex<Vec<(ConnectionId, String)>>,
}

impl CapturingPusher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// 指定した接続に届いたイベントをデコードして返す
    pub async fn events_for(&self, connection_id: &ConnectionId) -> Vec<ServerEvent> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|(target, _)| target == connection_id)
            .map(|(_, payload)| serde_json::from_str(payload).unwrap())
            .collect()
    }

    /// 全接続に届いたイベントをデコードして返す
    pub async fn all_events(&self) -> Vec<(ConnectionId, ServerEvent)> {
        self.sent
            .lock()
            .await
            .iter()
            .map(|(target, payload)| (target.clone(), serde_json::from_str(payload).unwrap()))
            .collect()
    }

    pub async fn clear(&self) {
        self.sent.lock().await.clear();
    }
}

#[async_trait]
impl MessagePusher for CapturingPusher {
    async fn register_connection(&self, _connection_id: ConnectionId, _sender: PusherChannel) {}

    async fn unregister_connection(&self, _connection_id: &ConnectionId) {}

    async fn push_to(
        &self,
        connection_id: &ConnectionId,
        content: &str,
    ) -> Result<(), MessagePushError> {
        self.sent
            .lock()
            .await
            .push((connection_id.clone(), content.to_string()));
        Ok(())
    }

    async fn broadcast(&self, targets: &[ConnectionId], content: &str) -> usize {
        let mut sent = self.sent.lock().await;
        for target in targets {
            sent.push((target.clone(), content.to_string()));
        }
        targets.len()
    }
}
