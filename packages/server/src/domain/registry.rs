//! 接続レジストリ
//!
//! どのユーザーがどのトランスポート接続で到達可能かを追跡する状態機械。
//! 1 ユーザーは 0..N 本の接続（複数タブ・複数デバイス）を同時に持てる。
//!
//! ## 失敗セマンティクス
//!
//! 接続ライフサイクルのレース（重複ハンドシェイク、二重切断、順序逆転）は
//! 想定内の事象であり、エラーにしない。未知の ID への操作は常に no-op、
//! 登録済み ID への再登録は置き換えとして扱う。

use std::collections::{HashMap, HashSet};

use super::value_object::{ConnectionId, Timestamp, UserId};

/// 1 本の接続に紐づく情報
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    /// 接続を所有するユーザー
    pub user_id: UserId,
    /// 接続確立時刻
    pub connected_at: Timestamp,
    /// 最終アクティビティ時刻
    pub last_activity_at: Timestamp,
}

/// 接続解除の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeregisterOutcome {
    /// 接続を所有していたユーザー
    pub user_id: UserId,
    /// そのユーザーの最後の接続だったかどうか
    pub was_last_connection: bool,
}

/// ユーザー → 生存接続のインメモリレジストリ
///
/// プロセス再起動で空から再構築される（クライアントは再接続時に再参加する）。
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, ConnectionInfo>,
    user_index: HashMap<UserId, HashSet<ConnectionId>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 接続を登録する
    ///
    /// 同じ接続 ID での再登録はエラーにせず、レコードを置き換える
    /// （重複ハンドシェイクのレース対策）。
    pub fn register(&mut self, user_id: UserId, connection_id: ConnectionId, now: Timestamp) {
        // 既存レコードがあれば先に旧ユーザーの索引から外す
        if let Some(previous) = self.connections.remove(&connection_id) {
            self.remove_from_index(&previous.user_id, &connection_id);
        }

        self.user_index
            .entry(user_id.clone())
            .or_default()
            .insert(connection_id.clone());
        self.connections.insert(
            connection_id,
            ConnectionInfo {
                user_id,
                connected_at: now,
                last_activity_at: now,
            },
        );
    }

    /// 接続を解除する
    ///
    /// 未知の接続 ID の場合は no-op として `None` を返す（二重切断イベント対策）。
    pub fn deregister(&mut self, connection_id: &ConnectionId) -> Option<DeregisterOutcome> {
        let info = self.connections.remove(connection_id)?;
        self.remove_from_index(&info.user_id, connection_id);
        let was_last_connection = !self.user_index.contains_key(&info.user_id);
        Some(DeregisterOutcome {
            user_id: info.user_id,
            was_last_connection,
        })
    }

    /// 最終アクティビティ時刻を更新する（未知の ID は no-op）
    pub fn touch(&mut self, connection_id: &ConnectionId, now: Timestamp) {
        if let Some(info) = self.connections.get_mut(connection_id) {
            info.last_activity_at = now;
        }
    }

    /// ユーザーの生存接続 ID のスナップショットを返す（未知のユーザーは空）
    pub fn connections_for(&self, user_id: &UserId) -> Vec<ConnectionId> {
        self.user_index
            .get(user_id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// 接続の所有ユーザーを返す
    pub fn owner_of(&self, connection_id: &ConnectionId) -> Option<&UserId> {
        self.connections.get(connection_id).map(|info| &info.user_id)
    }

    /// ユーザーが 1 本以上の生存接続を持つかどうか
    pub fn is_online(&self, user_id: &UserId) -> bool {
        self.user_index.contains_key(user_id)
    }

    /// 全ての生存接続 ID のスナップショット
    pub fn all_connections(&self) -> Vec<ConnectionId> {
        self.connections.keys().cloned().collect()
    }

    /// 1 本以上の接続を持つユーザーのスナップショット（client_id 順）
    pub fn online_users(&self) -> Vec<UserId> {
        let mut users: Vec<UserId> = self.user_index.keys().cloned().collect();
        users.sort();
        users
    }

    /// 生存接続数
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    fn remove_from_index(&mut self, user_id: &UserId, connection_id: &ConnectionId) {
        if let Some(set) = self.user_index.get_mut(user_id) {
            set.remove(connection_id);
            if set.is_empty() {
                self.user_index.remove(user_id);
            }
        }
    }
}
