//! Value objects.
//!
//! Every value object validates itself on construction, so any instance that
//! exists is well-formed.

use std::fmt;

use uuid::Uuid;

use super::ValueObjectError;

/// Maximum length (in characters) of a user id.
pub const MAX_USER_ID_LEN: usize = 64;
/// Maximum length (in characters) of a username.
pub const MAX_USERNAME_LEN: usize = 64;
/// Maximum length (in characters) of a room key.
pub const MAX_ROOM_KEY_LEN: usize = 128;

fn validate_key(
    value: &str,
    max_len: usize,
    empty: ValueObjectError,
    too_long: ValueObjectError,
) -> Result<(), ValueObjectError> {
    if value.trim().is_empty() {
        return Err(empty);
    }
    if value.chars().count() > max_len {
        return Err(too_long);
    }
    Ok(())
}

/// Stable user key supplied by the authentication collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(String);

impl UserId {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        validate_key(
            &value,
            MAX_USER_ID_LEN,
            ValueObjectError::EmptyUserId,
            ValueObjectError::UserIdTooLong(MAX_USER_ID_LEN),
        )?;
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
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Display name of a user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Username(String);

impl Username {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        validate_key(
            &value,
            MAX_USERNAME_LEN,
            ValueObjectError::EmptyUsername,
            ValueObjectError::UsernameTooLong(MAX_USERNAME_LEN),
        )?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for Username {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Authenticated user: stable key plus display name.
///
/// Immutable for the lifetime of a connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    pub user_id: UserId,
    pub username: Username,
}

impl Identity {
    pub fn new(user_id: UserId, username: Username) -> Self {
        Self { user_id, username }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.username.as_str(), self.user_id)
    }
}

/// Stable key of a room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomKey(String);

impl RoomKey {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        validate_key(
            &value,
            MAX_ROOM_KEY_LEN,
            ValueObjectError::EmptyRoomKey,
            ValueObjectError::RoomKeyTooLong(MAX_ROOM_KEY_LEN),
        )?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for RoomKey {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Chat message body.
///
/// Rejects whitespace-only content and content longer than `max_len`
/// characters. The original text is kept as-is (no trimming).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageContent(String);

impl MessageContent {
    pub fn parse(value: String, max_len: usize) -> Result<Self, ValueObjectError> {
        if value.trim().is_empty() {
            return Err(ValueObjectError::EmptyContent);
        }
        let actual = value.chars().count();
        if actual > max_len {
            return Err(ValueObjectError::ContentTooLong {
                max: max_len,
                actual,
            });
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

/// Store-assigned message id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId(Uuid);

impl MessageId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifies one live transport endpoint.
///
/// Two connections of the same identity always have distinct ids, which is
/// what the registry's compare-and-delete keys on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Unix timestamp in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
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
    fn test_user_id_rejects_blank() {
        // テスト項目: 空白のみの UserId は生成できない
        // given (前提条件):
        let value = "   ".to_string();

        // when (操作):
        let result = UserId::new(value);

        // then (期待する結果):
        assert_eq!(result, Err(ValueObjectError::EmptyUserId));
    }

    #[test]
    fn test_user_id_rejects_too_long() {
        // テスト項目: 最大長を超える UserId は生成できない
        // given (前提条件):
        let value = "a".repeat(MAX_USER_ID_LEN + 1);

        // when (操作):
        let result = UserId::try_from(value);

        // then (期待する結果):
        assert_eq!(
            result,
            Err(ValueObjectError::UserIdTooLong(MAX_USER_ID_LEN))
        );
    }

    #[test]
    fn test_room_key_accepts_valid_value() {
        // テスト項目: 正しい RoomKey が生成でき、文字列として取り出せる
        // given (前提条件):
        let value = "general".to_string();

        // when (操作):
        let key = RoomKey::new(value).unwrap();

        // then (期待する結果):
        assert_eq!(key.as_str(), "general");
        assert_eq!(key.to_string(), "general");
    }

    #[test]
    fn test_message_content_rejects_whitespace_only() {
        // テスト項目: 空白だけのメッセージは EmptyContent になる
        // given (前提条件):
        let value = " \n\t ".to_string();

        // when (操作):
        let result = MessageContent::parse(value, 100);

        // then (期待する結果):
        assert_eq!(result, Err(ValueObjectError::EmptyContent));
    }

    #[test]
    fn test_message_content_counts_characters_not_bytes() {
        // テスト項目: 文字数（バイト数ではない）で長さを判定する
        // given (前提条件):
        let value = "こんにちは".to_string(); // 5 文字 / 15 バイト

        // when (操作):
        let ok = MessageContent::parse(value.clone(), 5);
        let too_long = MessageContent::parse(value, 4);

        // then (期待する結果):
        assert_eq!(ok.unwrap().as_str(), "こんにちは");
        assert_eq!(
            too_long,
            Err(ValueObjectError::ContentTooLong { max: 4, actual: 5 })
        );
    }

    #[test]
    fn test_message_content_keeps_original_text() {
        // テスト項目: 前後の空白は保持される（トリムしない）
        // given (前提条件):
        let value = "  hello  ".to_string();

        // when (操作):
        let content = MessageContent::parse(value, 100).unwrap();

        // then (期待する結果):
        assert_eq!(content.into_string(), "  hello  ");
    }

    #[test]
    fn test_connection_ids_are_unique() {
        // テスト項目: ConnectionId は毎回異なる値が生成される
        // given (前提条件) / when (操作):
        let a = ConnectionId::generate();
        let b = ConnectionId::generate();

        // then (期待する結果):
        assert_ne!(a, b);
    }
}
