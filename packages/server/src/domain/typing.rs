//! タイピング台帳
//!
//! (ルーム, ユーザー) ごとの「入力中」シグナルを保持する。シグナルは永続化されず、
//! 明示的な stop・メッセージ送信・期限切れのいずれかで消える。
//!
//! キーは接続ではなくユーザー単位。複数タブからの同時入力は 1 つのシグナルに
//! まとまり、どのタブの start でも更新（refresh）、どのタブの stop でも解除になる。
//!
//! 期限切れタイマーはユースケース層（TypingCoordinator）が管理する。台帳は
//! プレゼンス台帳と同じ世代カウンタ方式で、refresh 後に発火した古いタイマーを
//! 無効化する。

use std::collections::HashMap;

use super::value_object::{RoomId, UserId};

/// (ルーム, ユーザー) → 世代のインメモリ台帳
#[derive(Debug, Default)]
pub struct TypingLedger {
    signals: HashMap<(RoomId, UserId), u64>,
    epoch_counter: u64,
}

impl TypingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// 入力中シグナルを開始または更新し、期限切れチェックのチケット（世代）を返す
    ///
    /// 既に入力中の場合も世代が進むため、以前に予約された期限切れは無効になる。
    pub fn start(&mut self, room_id: RoomId, user_id: UserId) -> u64 {
        self.epoch_counter += 1;
        self.signals.insert((room_id, user_id), self.epoch_counter);
        self.epoch_counter
    }

    /// 入力中シグナルを明示的に解除する
    ///
    /// シグナルが存在した場合のみ true を返す。受信側への stop 通知は
    /// true のときだけ行えばよい（重複 stop の抑制）。
    pub fn stop(&mut self, room_id: &RoomId, user_id: &UserId) -> bool {
        self.signals
            .remove(&(room_id.clone(), user_id.clone()))
            .is_some()
    }

    /// 期限切れによる解除を試みる
    ///
    /// チケットの世代が現在の世代と一致する場合のみ解除し、true を返す。
    /// start による refresh や明示的な stop が挟まっていた場合は no-op。
    pub fn expire(&mut self, room_id: &RoomId, user_id: &UserId, epoch: u64) -> bool {
        let key = (room_id.clone(), user_id.clone());
        if self.signals.get(&key).copied() == Some(epoch) {
            self.signals.remove(&key);
            true
        } else {
            false
        }
    }

    /// ユーザーがルームで入力中かどうか
    pub fn is_typing(&self, room_id: &RoomId, user_id: &UserId) -> bool {
        self.signals
            .contains_key(&(room_id.clone(), user_id.clone()))
    }

    /// ルームで入力中のユーザーのスナップショット（ID 順）
    pub fn typing_in(&self, room_id: &RoomId) -> Vec<UserId> {
        let mut users: Vec<UserId> = self
            .signals
            .keys()
            .filter(|(signal_room, _)| signal_room == room_id)
            .map(|(_, user_id)| user_id.clone())
            .collect();
        users.sort();
        users
    }
}
