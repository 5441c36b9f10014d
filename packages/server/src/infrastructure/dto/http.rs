//! HTTP API response DTOs.

use serde::{Deserialize, Serialize};

use super::websocket::UserInfo;

/// `GET /api/online`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnlineUsersDto {
    pub count: usize,
    pub users: Vec<UserInfo>,
}

/// One entry of `GET /api/users`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPresenceDto {
    pub user_id: String,
    pub username: String,
    pub is_online: bool,
    /// RFC 3339, absent if the user has never gone offline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<String>,
}

/// `POST /api/rooms` request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRoomRequest {
    pub room_id: String,
    pub name: String,
}

/// One room of `GET /api/rooms`, also the `POST /api/rooms` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomDto {
    pub room_id: String,
    pub name: String,
    /// Absent for rooms loaded from seed data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    /// Member user ids, sorted
    pub members: Vec<String>,
    /// Unix timestamp in milliseconds
    pub created_at: i64,
}
