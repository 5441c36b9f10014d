//! UseCase 層のエラー定義

use thiserror::Error;

use crate::domain::{RejectReason, RoomKey, ValueObjectError};

/// 接続（認証 → アクティブ化）のエラー
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectError {
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
    #[error("authentication timed out")]
    AuthTimeout,
    #[error("failed to load room membership: {0}")]
    MembershipUnavailable(String),
}

impl ConnectError {
    pub fn reason(&self) -> RejectReason {
        match self {
            Self::Unauthenticated(_) | Self::AuthTimeout => RejectReason::Unauthenticated,
            Self::MembershipUnavailable(_) => RejectReason::StoreUnavailable,
        }
    }
}

/// ルーム参加のエラー
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JoinError {
    #[error("not a member of room '{0}'")]
    NotAMember(RoomKey),
    #[error("membership check for room '{room}' failed: {detail}")]
    MembershipCheckFailed { room: RoomKey, detail: String },
}

impl JoinError {
    pub fn room(&self) -> &RoomKey {
        match self {
            Self::NotAMember(room) | Self::MembershipCheckFailed { room, .. } => room,
        }
    }

    pub fn reason(&self) -> RejectReason {
        match self {
            Self::NotAMember(_) => RejectReason::NotAMember,
            Self::MembershipCheckFailed { .. } => RejectReason::StoreUnavailable,
        }
    }
}

/// メッセージ送信のエラー
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("message content must not be empty")]
    EmptyContent,
    #[error("message content is {actual} characters, limit is {max}")]
    ContentTooLong { max: usize, actual: usize },
    #[error("direct message to yourself")]
    SelfDirectMessage,
    #[error("room '{0}' has not been joined")]
    RoomNotJoined(RoomKey),
    #[error("failed to persist message: {0}")]
    PersistFailure(String),
}

impl RouteError {
    pub fn reason(&self) -> RejectReason {
        match self {
            Self::EmptyContent => RejectReason::EmptyContent,
            Self::ContentTooLong { .. } => RejectReason::ContentTooLong,
            Self::SelfDirectMessage => RejectReason::SelfDirectMessage,
            Self::RoomNotJoined(_) => RejectReason::RoomNotJoined,
            Self::PersistFailure(_) => RejectReason::PersistFailure,
        }
    }
}

impl From<ValueObjectError> for RouteError {
    fn from(error: ValueObjectError) -> Self {
        match error {
            ValueObjectError::ContentTooLong { max, actual } => {
                Self::ContentTooLong { max, actual }
            }
            _ => Self::EmptyContent,
        }
    }
}

/// 入力中通知のエラー
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypingError {
    #[error("typing to yourself")]
    SelfDirectMessage,
    #[error("room '{0}' has not been joined")]
    RoomNotJoined(RoomKey),
}

impl TypingError {
    pub fn reason(&self) -> RejectReason {
        match self {
            Self::SelfDirectMessage => RejectReason::SelfDirectMessage,
            Self::RoomNotJoined(_) => RejectReason::RoomNotJoined,
        }
    }
}

/// ルーム作成・一覧のエラー
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RoomError {
    #[error("room name must be 1 to {0} characters")]
    InvalidName(usize),
    #[error("room '{0}' already exists")]
    AlreadyExists(RoomKey),
    #[error("store call failed: {0}")]
    StoreUnavailable(String),
}
