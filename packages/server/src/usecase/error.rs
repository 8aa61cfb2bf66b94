//! ユースケース層のエラー定義
//!
//! 認証・認可・永続化の失敗は操作単位で終端し、要求元のクライアントにのみ
//! 同期的に報告される。それ以外の事象（個別接続への配信失敗、
//! stale membership）はローカルで回復し、操作の失敗としては扱わない。

use thiserror::Error;

use crate::domain::{AuthenticationError, AuthorizationError, PersistenceError};

/// 接続確立の失敗
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConnectError {
    /// ハンドシェイクで身元を確立できなかった
    #[error(transparent)]
    Authentication(#[from] AuthenticationError),
}

/// ルーム参加の失敗
#[derive(Debug, Error, PartialEq, Eq)]
pub enum JoinRoomError {
    /// 参加者ではないルームへの join
    #[error(transparent)]
    Unauthorized(#[from] AuthorizationError),
}

/// メッセージ送信の失敗
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendMessageError {
    /// 参加者ではないルームへの送信。何も永続化されず、何も配信されない
    #[error(transparent)]
    Unauthorized(#[from] AuthorizationError),

    /// 永続化の失敗。ファンアウトは一切行われない
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// 既読通知の失敗
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MarkReadError {
    /// 参加者ではないルームへの既読通知
    #[error(transparent)]
    Unauthorized(#[from] AuthorizationError),
}

/// 履歴再送の失敗
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FetchHistoryError {
    /// 参加者ではないルームの履歴要求
    #[error(transparent)]
    Unauthorized(#[from] AuthorizationError),

    /// ストアからの読み出し失敗
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
