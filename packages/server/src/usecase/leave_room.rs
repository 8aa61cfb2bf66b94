//! UseCase: ルーム離脱処理
//!
//! (接続, ルーム) のメンバーシップの辺を 1 本だけ取り除く。
//! 存在しない辺の離脱は no-op で、エラーにしない。

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::domain::{ConnectionId, RoomId, RoomMembership};

/// ルーム離脱のユースケース
pub struct LeaveRoomUseCase {
    /// ルームメンバーシップ（共有状態）
    membership: Arc<Mutex<RoomMembership>>,
}

impl LeaveRoomUseCase {
    /// 新しい LeaveRoomUseCase を作成
    pub fn new(membership: Arc<Mutex<RoomMembership>>) -> Self {
        Self { membership }
    }

    /// ルーム離脱を実行（辺が存在した場合のみ true）
    pub async fn execute(&self, connection_id: &ConnectionId, room_id: &RoomId) -> bool {
        let removed = {
            let mut membership = self.membership.lock().await;
            membership.leave(connection_id, room_id)
        };
        if removed {
            tracing::debug!(
                "Connection '{}' left room '{}'",
                connection_id.as_str(),
                room_id.as_str()
            );
        }
        removed
    }
}
