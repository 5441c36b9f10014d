//! JSON seed file for the in-memory store.
//!
//! ```json
//! {
//!   "users": [{ "id": "u1", "username": "alice" }],
//!   "rooms": [{ "id": "general", "name": "General", "members": ["u1"] }]
//! }
//! ```

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::domain::{Identity, RoomKey, UserId, Username, ValueObjectError};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read seed file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse seed file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid seed entry: {0}")]
    Invalid(#[from] ValueObjectError),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreSeed {
    #[serde(default)]
    pub users: Vec<SeedUser>,
    #[serde(default)]
    pub rooms: Vec<SeedRoom>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedUser {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedRoom {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub members: Vec<String>,
}

impl StoreSeed {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SeedError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, SeedError> {
        Ok(serde_json::from_str(raw)?)
    }
}

impl SeedUser {
    pub fn to_identity(&self) -> Result<Identity, ValueObjectError> {
        Ok(Identity::new(
            UserId::new(self.id.clone())?,
            Username::new(self.username.clone())?,
        ))
    }
}

impl SeedRoom {
    pub fn key(&self) -> Result<RoomKey, ValueObjectError> {
        RoomKey::new(self.id.clone())
    }

    pub fn member_ids(&self) -> Result<Vec<UserId>, ValueObjectError> {
        self.members.iter().cloned().map(UserId::new).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seed_json() {
        // テスト項目: シード JSON が読み込める
        // given (前提条件):
        let raw = r#"{
            "users": [{"id": "u1", "username": "alice"}],
            "rooms": [{"id": "general", "name": "General", "members": ["u1"]}]
        }"#;

        // when (操作):
        let seed = StoreSeed::from_json(raw).unwrap();

        // then (期待する結果):
        assert_eq!(seed.users.len(), 1);
        assert_eq!(seed.users[0].to_identity().unwrap().username.as_str(), "alice");
        assert_eq!(seed.rooms[0].key().unwrap().as_str(), "general");
        assert_eq!(seed.rooms[0].member_ids().unwrap()[0].as_str(), "u1");
    }

    #[test]
    fn test_parse_seed_with_missing_sections() {
        // テスト項目: users / rooms が省略されていても空として読み込める
        // given (前提条件):
        let raw = "{}";

        // when (操作):
        let seed = StoreSeed::from_json(raw).unwrap();

        // then (期待する結果):
        assert!(seed.users.is_empty());
        assert!(seed.rooms.is_empty());
    }

    #[test]
    fn test_invalid_member_id_is_reported() {
        // テスト項目: 空のメンバー ID は Invalid エラーになる
        // given (前提条件):
        let seed = StoreSeed::from_json(
            r#"{"rooms": [{"id": "general", "name": "General", "members": [""]}]}"#,
        )
        .unwrap();

        // when (操作):
        let result = seed.rooms[0].member_ids();

        // then (期待する結果):
        assert_eq!(result, Err(ValueObjectError::EmptyUserId));
    }
}
