//! メッセージストアの trait 定義
//!
//! メッセージ履歴の永続化はこのコアの外側にある外部コラボレータであり、
//! ドメイン層はそのインターフェースだけを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。
//!
//! ## 順序の権威
//!
//! メッセージ ID と連番（[`super::Sequence`]）の採番はストアだけが行う。
//! 同一ルームへの並行送信がどの順でコミットされたかはストアが決め、
//! ディスパッチャはその順序をそのまま配信する。

use async_trait::async_trait;
use thiserror::Error;

use super::entity::MessageEvent;
use super::value_object::{CorrelationId, MessageContent, RoomId, Sequence, UserId};

/// 永続化の失敗
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PersistenceError {
    /// 追記が拒否された（容量超過など）
    #[error("message store rejected the append: {0}")]
    AppendRejected(String),

    /// ストアに到達できない
    #[error("message store is unavailable: {0}")]
    Unavailable(String),
}

/// メッセージストアへのインターフェース
///
/// `append` が成功を返した時点でメッセージは永続化が確定している。
/// ユースケース層はこの trait に依存し、Infrastructure 層の具体的な実装には依存しない。
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// メッセージを永続化し、採番済みの確定イベントを返す
    async fn append(
        &self,
        room_id: RoomId,
        sender_id: UserId,
        content: MessageContent,
        correlation_id: Option<CorrelationId>,
    ) -> Result<MessageEvent, PersistenceError>;

    /// 指定した連番より後のメッセージイベントを採番順で返す
    async fn fetch_since(
        &self,
        room_id: &RoomId,
        since: Sequence,
    ) -> Result<Vec<MessageEvent>, PersistenceError>;
}
