//! Domain error types.

use thiserror::Error;

use super::ConnectionId;

/// Value object validation errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValueObjectError {
    #[error("user id must not be empty")]
    EmptyUserId,
    #[error("user id must be at most {0} characters")]
    UserIdTooLong(usize),
    #[error("username must not be empty")]
    EmptyUsername,
    #[error("username must be at most {0} characters")]
    UsernameTooLong(usize),
    #[error("room key must not be empty")]
    EmptyRoomKey,
    #[error("room key must be at most {0} characters")]
    RoomKeyTooLong(usize),
    #[error("message content must not be empty")]
    EmptyContent,
    #[error("message content is {actual} characters, limit is {max}")]
    ContentTooLong { max: usize, actual: usize },
}

/// Durable store errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store call timed out")]
    Timeout,
    #[error("room '{0}' already exists")]
    RoomAlreadyExists(String),
}

/// Authentication collaborator errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
}

/// Push to a connection failed
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PushError {
    #[error("connection {0} is closed")]
    ConnectionClosed(ConnectionId),
}
