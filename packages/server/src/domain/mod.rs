//! Domain layer: value objects, entities, events and collaborator interfaces.
//!
//! The domain layer depends on nothing but itself. Infrastructure implements
//! the traits defined here (`ChatStore`, `Authenticator`).

pub mod authenticator;
pub mod connection;
pub mod entity;
pub mod error;
pub mod event;
pub mod repository;
pub mod value_object;

pub use authenticator::Authenticator;
pub use connection::{Connection, PusherChannel};
pub use entity::{
    CanonicalMessage, OnlineSnapshot, RejectReason, Room, Target, TypingScope, UserPresence,
};
pub use error::{AuthError, PushError, StoreError, ValueObjectError};
pub use event::{InboundEvent, OutboundEvent};
pub use repository::ChatStore;
pub use value_object::{
    ConnectionId, Identity, MessageContent, MessageId, RoomKey, Timestamp, UserId, Username,
};

#[cfg(test)]
pub use authenticator::MockAuthenticator;
#[cfg(test)]
pub use repository::MockChatStore;
