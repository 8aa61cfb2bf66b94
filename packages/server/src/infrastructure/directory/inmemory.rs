//! InMemory 参加者ディレクトリと開発用トークン検証
//!
//! 会話の参加者名簿とセッション検証は本来このコアの外側のサービスが持つ。
//! このモジュールはその単一ノード・開発用のスタンドインを提供します。

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    AuthenticationError, IdentityVerifier, ParticipantDirectory, RoomId, UserId,
};

/// インメモリ参加者ディレクトリ
///
/// ルームごとの名簿を明示的に登録して使う。`allow_all` モードでは
/// 全ユーザーが全ルームの参加者として扱われる（開発サーバー向け）。
pub struct InMemoryParticipantDirectory {
    rosters: Mutex<HashMap<RoomId, HashSet<UserId>>>,
    allow_all: bool,
}

impl InMemoryParticipantDirectory {
    /// 空の名簿で作成する（参加者は `grant` で登録する）
    pub fn new() -> Self {
        Self {
            rosters: Mutex::new(HashMap::new()),
            allow_all: false,
        }
    }

    /// 全ユーザーを全ルームの参加者として扱うモードで作成する
    pub fn allow_all() -> Self {
        Self {
            rosters: Mutex::new(HashMap::new()),
            allow_all: true,
        }
    }

    /// ユーザーをルームの参加者として登録する
    pub async fn grant(&self, room_id: RoomId, user_id: UserId) {
        let mut rosters = self.rosters.lock().await;
        rosters.entry(room_id).or_default().insert(user_id);
    }
}

impl Default for InMemoryParticipantDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ParticipantDirectory for InMemoryParticipantDirectory {
    async fn is_participant(&self, user_id: &UserId, room_id: &RoomId) -> bool {
        if self.allow_all {
            return true;
        }
        let rosters = self.rosters.lock().await;
        rosters
            .get(room_id)
            .is_some_and(|roster| roster.contains(user_id))
    }

    async fn participants_of(&self, room_id: &RoomId) -> Vec<UserId> {
        let rosters = self.rosters.lock().await;
        let mut participants: Vec<UserId> = rosters
            .get(room_id)
            .map(|roster| roster.iter().cloned().collect())
            .unwrap_or_default();
        // 一貫した順序で返す
        participants.sort();
        participants
    }
}

/// 開発用トークン検証
///
/// トークン文字列をそのままユーザー識別子として受け入れる。
/// 本番ではセッションサービスに対する IdentityVerifier 実装に差し替えること。
pub struct DevTokenVerifier;

#[async_trait]
impl IdentityVerifier for DevTokenVerifier {
    async fn verify(&self, token: &str) -> Result<UserId, AuthenticationError> {
        if token.trim().is_empty() {
            return Err(AuthenticationError::MissingToken);
        }
        UserId::new(token.to_string()).map_err(|_| AuthenticationError::InvalidToken)
    }
}
