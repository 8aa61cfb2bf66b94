//! ドメイン層の値オブジェクト
//!
//! 文字列やプリミティブ値をそのまま持ち回らず、検証済みの newtype として扱います。
//! DTO 層との境界で `new` / `try_from` による検証を行い、ドメイン層の内側では
//! 常に妥当な値であることを保証します。

use thiserror::Error;
use uuid::Uuid;

/// 値オブジェクトの検証エラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValueError {
    /// 空文字列
    #[error("{0} must not be empty")]
    Empty(&'static str),

    /// 長さ超過
    #[error("{0} exceeds the maximum length of {1} characters")]
    TooLong(&'static str, usize),
}

const MAX_ID_LEN: usize = 64;
const MAX_CONTENT_LEN: usize = 2000;

fn validate_id(field: &'static str, value: &str) -> Result<(), ValueError> {
    if value.trim().is_empty() {
        return Err(ValueError::Empty(field));
    }
    if value.chars().count() > MAX_ID_LEN {
        return Err(ValueError::TooLong(field, MAX_ID_LEN));
    }
    Ok(())
}

/// ユーザーの論理的な識別子
///
/// 認証コラボレータ（[`crate::domain::IdentityVerifier`]）が検証したものだけが
/// ドメイン層に入ってくる。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(String);

impl UserId {
    pub fn new(value: String) -> Result<Self, ValueError> {
        validate_id("user_id", &value)?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = ValueError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// 1 本のトランスポート接続を表す一時的な識別子
///
/// セッションごとに一意。プロセスのメモリ上にのみ存在し、永続化されない。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new(value: String) -> Result<Self, ValueError> {
        validate_id("connection_id", &value)?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// ConnectionId の生成器（UUID v4）
pub struct ConnectionIdFactory;

impl ConnectionIdFactory {
    pub fn generate() -> ConnectionId {
        ConnectionId(Uuid::new_v4().to_string())
    }
}

/// 会話（ルーム）の識別子
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(value: String) -> Result<Self, ValueError> {
        validate_id("room_id", &value)?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for RoomId {
    type Error = ValueError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// メッセージの識別子（永続化層が採番する）
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(value: String) -> Result<Self, ValueError> {
        validate_id("message_id", &value)?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// MessageId の生成器（UUID v4）
pub struct MessageIdFactory;

impl MessageIdFactory {
    pub fn generate() -> MessageId {
        MessageId(Uuid::new_v4().to_string())
    }
}

/// クライアントが採番する相関 ID
///
/// 楽観的に表示したローカルメッセージと、サーバーが確定した [`super::MessageEvent`]
/// を突き合わせるために、送信インテントから確定イベントまで持ち回られる。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn new(value: String) -> Result<Self, ValueError> {
        validate_id("correlation_id", &value)?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// メッセージ本文
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageContent(String);

impl MessageContent {
    pub fn new(value: String) -> Result<Self, ValueError> {
        if value.is_empty() {
            return Err(ValueError::Empty("content"));
        }
        if value.chars().count() > MAX_CONTENT_LEN {
            return Err(ValueError::TooLong("content", MAX_CONTENT_LEN));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for MessageContent {
    type Error = ValueError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// ルーム内のメッセージ順序を決める連番
///
/// 採番は永続化層のみが行う。ディスパッチャはこの値を並べ替えの唯一の根拠とする。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Sequence(u64);

impl Sequence {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Unix タイムスタンプ（UTC、ミリ秒）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_accepts_valid_value() {
        // テスト項目: 妥当な文字列から UserId を生成できる
        // given (前提条件):
        let value = "alice".to_string();

        // when (操作):
        let result = UserId::new(value);

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(result.unwrap().as_str(), "alice");
    }

    #[test]
    fn test_user_id_rejects_empty_value() {
        // テスト項目: 空文字列からは UserId を生成できない
        // given (前提条件):
        let value = "".to_string();

        // when (操作):
        let result = UserId::new(value);

        // then (期待する結果):
        assert_eq!(result, Err(ValueError::Empty("user_id")));
    }

    #[test]
    fn test_user_id_rejects_whitespace_only_value() {
        // テスト項目: 空白のみの文字列からは UserId を生成できない
        // given (前提条件):
        let value = "   ".to_string();

        // when (操作):
        let result = UserId::new(value);

        // then (期待する結果):
        assert_eq!(result, Err(ValueError::Empty("user_id")));
    }

    #[test]
    fn test_user_id_rejects_too_long_value() {
        // テスト項目: 上限を超える長さの文字列からは UserId を生成できない
        // given (前提条件):
        let value = "a".repeat(MAX_ID_LEN + 1);

        // when (操作):
        let result = UserId::new(value);

        // then (期待する結果):
        assert_eq!(result, Err(ValueError::TooLong("user_id", MAX_ID_LEN)));
    }

    #[test]
    fn test_connection_id_factory_generates_unique_ids() {
        // テスト項目: ConnectionIdFactory が一意な ID を生成する
        // given (前提条件):

        // when (操作):
        let id1 = ConnectionIdFactory::generate();
        let id2 = ConnectionIdFactory::generate();

        // then (期待する結果):
        assert_ne!(id1, id2);
        assert!(!id1.as_str().is_empty());
    }

    #[test]
    fn test_message_id_factory_generates_unique_ids() {
        // テスト項目: MessageIdFactory が一意な ID を生成する
        // given (前提条件):

        // when (操作):
        let id1 = MessageIdFactory::generate();
        let id2 = MessageIdFactory::generate();

        // then (期待する結果):
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_message_content_accepts_valid_value() {
        // テスト項目: 妥当な本文から MessageContent を生成できる
        // given (前提条件):
        let value = "Hello!".to_string();

        // when (操作):
        let result = MessageContent::new(value);

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(result.unwrap().as_str(), "Hello!");
    }

    #[test]
    fn test_message_content_rejects_empty_value() {
        // テスト項目: 空の本文からは MessageContent を生成できない
        // given (前提条件):
        let value = "".to_string();

        // when (操作):
        let result = MessageContent::new(value);

        // then (期待する結果):
        assert_eq!(result, Err(ValueError::Empty("content")));
    }

    #[test]
    fn test_message_content_rejects_too_long_value() {
        // テスト項目: 上限を超える本文からは MessageContent を生成できない
        // given (前提条件):
        let value = "x".repeat(MAX_CONTENT_LEN + 1);

        // when (操作):
        let result = MessageContent::new(value);

        // then (期待する結果):
        assert_eq!(result, Err(ValueError::TooLong("content", MAX_CONTENT_LEN)));
    }

    #[test]
    fn test_sequence_ordering() {
        // テスト項目: Sequence が採番順で比較できる
        // given (前提条件):
        let first = Sequence::new(1);
        let second = Sequence::new(2);

        // when (操作):

        // then (期待する結果):
        assert!(first < second);
        assert_eq!(first.value(), 1);
    }
}
