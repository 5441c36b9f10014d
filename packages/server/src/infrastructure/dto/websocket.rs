//! WebSocket event DTOs (JSON text frames, tagged by `type`).

use serde::{Deserialize, Serialize};

/// Conversation kind on the wire
///
/// Any other value parses as `Unknown` so the frame is rejected as an invalid
/// target rather than an unreadable payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Room,
    Private,
    #[serde(other)]
    Unknown,
}

/// Client → server events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    JoinRoom {
        room_id: String,
    },
    SendMessage {
        content: String,
        message_type: MessageKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        recipient_id: Option<String>,
    },
    TypingStart {
        message_type: MessageKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        recipient_id: Option<String>,
    },
    TypingStop {
        message_type: MessageKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        recipient_id: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub user_id: String,
    pub username: String,
}

/// Canonical message as delivered to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageInfo {
    pub id: String,
    pub content: String,
    pub sender: UserInfo,
    pub message_type: MessageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_id: Option<String>,
    /// Unix timestamp in milliseconds
    pub created_at: i64,
}

/// Typing notification payload
///
/// `room_id` is set for room typing, `sender_id` for direct typing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingInfo {
    pub user_id: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
}

/// Server → client events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    ReceiveMessage { message: MessageInfo },
    UsersUpdated { users: Vec<UserInfo> },
    UserTyping(TypingInfo),
    UserStopTyping(TypingInfo),
    JoinedRoom { room_id: String },
    JoinRejected { room_id: String, reason: String },
    Error { reason: String, message: String },
    SessionReplaced,
}
