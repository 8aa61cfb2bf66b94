//! ルームメンバーシップ
//!
//! 会話 ID と、その会話に「参加表明（join）」している接続 ID の対応を保持する。
//! 接続レジストリとは独立した状態で、認可済みでも join していない接続は
//! ファンアウトの対象にならない。
//!
//! (connection, room) のペアは Joined / Not-Joined の 2 状態のみを持ち、
//! join / leave / leave_all でのみ遷移する。永続化はせず、プロセス再起動後は
//! クライアントの再 join で空から再構築される。

use std::collections::{HashMap, HashSet};

use super::value_object::{ConnectionId, RoomId};

/// ルーム ⇔ 接続の多対多メンバーシップ
#[derive(Debug, Default)]
pub struct RoomMembership {
    room_members: HashMap<RoomId, HashSet<ConnectionId>>,
    joined_rooms: HashMap<ConnectionId, HashSet<RoomId>>,
}

impl RoomMembership {
    pub fn new() -> Self {
        Self::default()
    }

    /// 接続をルームに参加させる（冪等）
    ///
    /// 戻り値は新規参加だったかどうか。認可チェックは呼び出し側
    /// （ユースケース層）が参加者ディレクトリに対して行う。
    pub fn join(&mut self, connection_id: ConnectionId, room_id: RoomId) -> bool {
        let newly_joined = self
            .room_members
            .entry(room_id.clone())
            .or_default()
            .insert(connection_id.clone());
        self.joined_rooms
            .entry(connection_id)
            .or_default()
            .insert(room_id);
        newly_joined
    }

    /// メンバーシップの辺を 1 本だけ取り除く（存在しなければ no-op）
    pub fn leave(&mut self, connection_id: &ConnectionId, room_id: &RoomId) -> bool {
        let removed = match self.room_members.get_mut(room_id) {
            Some(members) => members.remove(connection_id),
            None => false,
        };
        if removed {
            self.prune_room(room_id);
            if let Some(rooms) = self.joined_rooms.get_mut(connection_id) {
                rooms.remove(room_id);
                if rooms.is_empty() {
                    self.joined_rooms.remove(connection_id);
                }
            }
        }
        removed
    }

    /// 接続の全てのメンバーシップを取り除く（切断時のカスケード）
    ///
    /// 取り除いたルーム ID の一覧を返す。未知の接続は空を返す no-op。
    pub fn leave_all(&mut self, connection_id: &ConnectionId) -> Vec<RoomId> {
        let rooms: Vec<RoomId> = self
            .joined_rooms
            .remove(connection_id)
            .map(|set| set.into_iter().collect())
            .unwrap_or_default();
        for room_id in &rooms {
            if let Some(members) = self.room_members.get_mut(room_id) {
                members.remove(connection_id);
            }
            self.prune_room(room_id);
        }
        rooms
    }

    /// ルームに参加中の接続 ID のスナップショット（未知のルームは空）
    ///
    /// メッセージディスパッチャとタイピングコーディネータのファンアウト対象。
    pub fn members_of(&self, room_id: &RoomId) -> Vec<ConnectionId> {
        self.room_members
            .get(room_id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// 接続が参加中のルーム ID のスナップショット
    pub fn rooms_of(&self, connection_id: &ConnectionId) -> Vec<RoomId> {
        self.joined_rooms
            .get(connection_id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// 接続がルームに参加中かどうか
    pub fn is_member(&self, connection_id: &ConnectionId, room_id: &RoomId) -> bool {
        self.room_members
            .get(room_id)
            .is_some_and(|members| members.contains(connection_id))
    }

    fn prune_room(&mut self, room_id: &RoomId) {
        if self
            .room_members
            .get(room_id)
            .is_some_and(|members| members.is_empty())
        {
            self.room_members.remove(room_id);
        }
    }
}
