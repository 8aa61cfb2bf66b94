//! 認証・認可まわりの trait とエラー定義
//!
//! 身元確認（セッション発行・トークン検証）はこのコアの外側にある
//! 外部コラボレータ。ハンドシェイク時に一度だけ検証し、失敗した接続は
//! 接続レジストリに入る前に拒否される。

use async_trait::async_trait;
use thiserror::Error;

use super::value_object::UserId;

/// ハンドシェイクで身元を確立できなかった
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthenticationError {
    /// トークンが欠落している
    #[error("handshake token is missing")]
    MissingToken,

    /// トークンが拒否された
    #[error("handshake token was rejected")]
    InvalidToken,
}

/// 認証済みユーザーが、参加者でないルームを操作しようとした
///
/// 操作は拒否され、状態は一切変更されず、呼び出し元にのみ報告される。
#[derive(Debug, Error, PartialEq, Eq)]
#[error("user '{user_id}' is not a participant of room '{room_id}'")]
pub struct AuthorizationError {
    pub user_id: String,
    pub room_id: String,
}

/// ハンドシェイクの身元検証のインターフェース
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// トークンを検証し、ユーザー識別子を返す
    async fn verify(&self, token: &str) -> Result<UserId, AuthenticationError>;
}
