//! プレゼンス台帳
//!
//! 接続レジストリの遷移から導出した、ユーザーごとの確定済みプレゼンス状態を保持する。
//! オフラインへの遷移は猶予期間（デバウンス）を挟んでから確定するため、
//! 台帳はユーザーごとに世代カウンタ（epoch）を持ち、猶予中の再接続で
//! 予約済みのオフライン確定を無効化できるようにしている。
//!
//! タイマーそのものはユースケース層（PresenceTracker）が管理し、
//! この台帳は「どの予約がまだ有効か」の判定だけを担う。

use std::collections::HashMap;

use super::entity::{Presence, PresenceState};
use super::value_object::{Timestamp, UserId};

/// ユーザーごとの確定済みプレゼンスとデバウンス世代
#[derive(Debug, Default)]
pub struct PresenceLedger {
    states: HashMap<UserId, Presence>,
    epochs: HashMap<UserId, u64>,
}

impl PresenceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// 接続の登録を記録する
    ///
    /// 世代を進めて猶予中のオフライン確定を無効化した上で、
    /// オフライン → オンラインへの遷移が起きた場合のみ true を返す。
    pub fn note_connected(&mut self, user_id: &UserId, now: Timestamp) -> bool {
        self.bump_epoch(user_id);
        let previous = self.states.get(user_id).copied().unwrap_or_default();
        self.states.insert(user_id.clone(), Presence::online(now));
        previous.state == PresenceState::Offline
    }

    /// 接続の解除を記録し、オフライン確定チェックのチケット（世代）を発行する
    ///
    /// 発行したチケットは、猶予期間後に [`Self::try_commit_offline`] へ渡す。
    /// チケット発行後にユーザーが再接続すると世代が進み、チケットは無効になる。
    pub fn note_disconnected(&mut self, user_id: &UserId) -> u64 {
        self.bump_epoch(user_id)
    }

    /// 猶予期間が明けたオフライン確定を試みる
    ///
    /// チケットの世代が現在の世代と一致する場合のみ確定し、true を返す。
    /// 生存接続の有無は呼び出し側がレジストリに対して確認してから呼ぶこと。
    pub fn try_commit_offline(&mut self, user_id: &UserId, epoch: u64, now: Timestamp) -> bool {
        if self.epochs.get(user_id).copied() != Some(epoch) {
            return false;
        }
        let last_seen = match self.states.get(user_id) {
            Some(presence) if presence.is_online() => Some(now),
            Some(presence) => presence.last_seen_at,
            None => None,
        };
        let was_online = self
            .states
            .get(user_id)
            .is_some_and(|presence| presence.is_online());
        self.states
            .insert(user_id.clone(), Presence::offline(last_seen));
        was_online
    }

    /// 確定済みプレゼンスを返す
    ///
    /// 猶予期間中のユーザーは（まだオフラインが確定していないので）オンラインのまま。
    /// 一度も観測していないユーザーはオフライン扱い。
    pub fn current(&self, user_id: &UserId) -> Presence {
        self.states.get(user_id).copied().unwrap_or_default()
    }

    /// 確定済み状態を持つ全ユーザーのスナップショット（ID 順）
    pub fn snapshot(&self) -> Vec<(UserId, Presence)> {
        let mut entries: Vec<(UserId, Presence)> = self
            .states
            .iter()
            .map(|(user_id, presence)| (user_id.clone(), *presence))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    fn bump_epoch(&mut self, user_id: &UserId) -> u64 {
        let epoch = self.epochs.entry(user_id.clone()).or_insert(0);
        *epoch += 1;
        *epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> UserId {
        UserId::new(id.to_string()).unwrap()
    }

    #[test]
    fn test_first_connection_transitions_to_online() {
        // テスト項目: 初回接続でオフライン → オンラインの遷移が報告される
        // given (前提条件):
        let mut ledger = PresenceLedger::new();

        // when (操作):
        let transitioned = ledger.note_connected(&user("alice"), Timestamp::new(1000));

        // then (期待する結果):
        assert!(transitioned);
        assert!(ledger.current(&user("alice")).is_online());
    }

    #[test]
    fn test_second_connection_does_not_transition_again() {
        // テスト項目: 既にオンラインのユーザーの追加接続では遷移が報告されない
        // given (前提条件):
        let mut ledger = PresenceLedger::new();
        ledger.note_connected(&user("alice"), Timestamp::new(1000));

        // when (操作):
        let transitioned = ledger.note_connected(&user("alice"), Timestamp::new(2000));

        // then (期待する結果):
        assert!(!transitioned);
        assert!(ledger.current(&user("alice")).is_online());
    }

    #[test]
    fn test_unknown_user_defaults_to_offline() {
        // テスト項目: 一度も観測していないユーザーはオフライン扱い
        // given (前提条件):
        let ledger = PresenceLedger::new();

        // when (操作):
        let presence = ledger.current(&user("nobody"));

        // then (期待する結果):
        assert_eq!(presence.state, PresenceState::Offline);
        assert_eq!(presence.last_seen_at, None);
    }

    #[test]
    fn test_commit_offline_with_valid_ticket() {
        // テスト項目: 有効なチケットでオフラインが確定し、last_seen_at が記録される
        // given (前提条件):
        let mut ledger = PresenceLedger::new();
        ledger.note_connected(&user("alice"), Timestamp::new(1000));
        let ticket = ledger.note_disconnected(&user("alice"));

        // when (操作):
        let committed = ledger.try_commit_offline(&user("alice"), ticket, Timestamp::new(9000));

        // then (期待する結果):
        assert!(committed);
        let presence = ledger.current(&user("alice"));
        assert_eq!(presence.state, PresenceState::Offline);
        assert_eq!(presence.last_seen_at, Some(Timestamp::new(9000)));
    }

    #[test]
    fn test_reconnect_invalidates_pending_offline_ticket() {
        // テスト項目: 猶予中の再接続でチケットが無効になり、オフラインは確定しない
        // given (前提条件):
        let mut ledger = PresenceLedger::new();
        ledger.note_connected(&user("alice"), Timestamp::new(1000));
        let ticket = ledger.note_disconnected(&user("alice"));

        // when (操作): 猶予期間中に再接続
        ledger.note_connected(&user("alice"), Timestamp::new(2000));
        let committed = ledger.try_commit_offline(&user("alice"), ticket, Timestamp::new(9000));

        // then (期待する結果):
        assert!(!committed);
        assert!(ledger.current(&user("alice")).is_online());
    }

    #[test]
    fn test_newer_disconnect_invalidates_older_ticket() {
        // テスト項目: 新しい切断チケットの発行で古いチケットが無効になる
        // given (前提条件):
        let mut ledger = PresenceLedger::new();
        ledger.note_connected(&user("alice"), Timestamp::new(1000));
        let old_ticket = ledger.note_disconnected(&user("alice"));
        ledger.note_connected(&user("alice"), Timestamp::new(2000));
        let new_ticket = ledger.note_disconnected(&user("alice"));

        // when (操作):
        let old_committed =
            ledger.try_commit_offline(&user("alice"), old_ticket, Timestamp::new(9000));
        let new_committed =
            ledger.try_commit_offline(&user("alice"), new_ticket, Timestamp::new(9000));

        // then (期待する結果): 古いチケットは無効、新しいチケットだけが確定する
        assert!(!old_committed);
        assert!(new_committed);
    }

    #[test]
    fn test_commit_offline_twice_reports_transition_once() {
        // テスト項目: 同じ状態への二重確定では遷移が一度しか報告されない
        // given (前提条件):
        let mut ledger = PresenceLedger::new();
        ledger.note_connected(&user("alice"), Timestamp::new(1000));
        let ticket = ledger.note_disconnected(&user("alice"));

        // when (操作):
        let first = ledger.try_commit_offline(&user("alice"), ticket, Timestamp::new(9000));
        let second = ledger.try_commit_offline(&user("alice"), ticket, Timestamp::new(9500));

        // then (期待する結果): 2 回目はオンライン → オフラインの遷移ではない
        assert!(first);
        assert!(!second);
    }

    #[test]
    fn test_snapshot_sorted_by_user_id() {
        // テスト項目: スナップショットがユーザー ID 順で返される
        // given (前提条件):
        let mut ledger = PresenceLedger::new();
        ledger.note_connected(&user("charlie"), Timestamp::new(1000));
        ledger.note_connected(&user("alice"), Timestamp::new(1000));

        // when (操作):
        let snapshot = ledger.snapshot();

        // then (期待する結果):
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].0, user("alice"));
        assert_eq!(snapshot[1].0, user("charlie"));
    }
}
