//! Domain entities.

use std::collections::HashSet;

use super::{Identity, MessageContent, MessageId, RoomKey, Timestamp, UserId};

/// Conversation target: exactly one room or exactly one peer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    Room(RoomKey),
    Direct(UserId),
}

/// Namespace of typing state.
///
/// A direct conversation is keyed by the unordered pair of participants, so
/// alice typing to bob and bob typing to alice share one scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypingScope {
    Room(RoomKey),
    Direct { low: UserId, high: UserId },
}

impl TypingScope {
    /// Scope of a typing signal sent by `typist` to `target`.
    pub fn for_target(typist: &UserId, target: &Target) -> Self {
        match target {
            Target::Room(room) => Self::Room(room.clone()),
            Target::Direct(peer) => Self::between(typist.clone(), peer.clone()),
        }
    }

    /// Scope of the direct conversation between `a` and `b`.
    pub fn between(a: UserId, b: UserId) -> Self {
        if a <= b {
            Self::Direct { low: a, high: b }
        } else {
            Self::Direct { low: b, high: a }
        }
    }

    /// Target as seen from `typist`: the room, or the other participant.
    pub fn target_for(&self, typist: &UserId) -> Target {
        match self {
            Self::Room(room) => Target::Room(room.clone()),
            Self::Direct { low, high } if low == typist => Target::Direct(high.clone()),
            Self::Direct { low, .. } => Target::Direct(low.clone()),
        }
    }
}

/// Persisted, store-assigned version of a message.
///
/// Every recipient of a delivery receives this exact record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalMessage {
    pub id: MessageId,
    pub sender: Identity,
    pub target: Target,
    pub content: MessageContent,
    pub created_at: Timestamp,
}

/// Fully recomputed view of the identities currently online.
///
/// Sorted by user id so two snapshots of the same registry compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OnlineSnapshot {
    identities: Vec<Identity>,
}

impl OnlineSnapshot {
    pub fn new(mut identities: Vec<Identity>) -> Self {
        identities.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        identities.dedup_by(|a, b| a.user_id == b.user_id);
        Self { identities }
    }

    pub fn identities(&self) -> &[Identity] {
        &self.identities
    }

    pub fn contains(&self, user_id: &UserId) -> bool {
        self.identities
            .binary_search_by(|identity| identity.user_id.cmp(user_id))
            .is_ok()
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}

/// Durable room record with its member set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub key: RoomKey,
    pub name: String,
    /// `None` for rooms loaded from seed data
    pub created_by: Option<UserId>,
    pub members: HashSet<UserId>,
    pub created_at: Timestamp,
}

/// A user known to the durable store, with its durable presence flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPresence {
    pub identity: Identity,
    pub is_online: bool,
    pub last_seen: Option<Timestamp>,
}

/// Stable reason code attached to every rejection sent to a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    Unauthenticated,
    NotAMember,
    InvalidTarget,
    EmptyContent,
    ContentTooLong,
    SelfDirectMessage,
    RoomNotJoined,
    PersistFailure,
    StoreUnavailable,
    InvalidPayload,
}

impl RejectReason {
    /// Wire code of the reason.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::NotAMember => "not_a_member",
            Self::InvalidTarget => "invalid_target",
            Self::EmptyContent => "empty_content",
            Self::ContentTooLong => "content_too_long",
            Self::SelfDirectMessage => "self_direct_message",
            Self::RoomNotJoined => "room_not_joined",
            Self::PersistFailure => "persist_failure",
            Self::StoreUnavailable => "store_unavailable",
            Self::InvalidPayload => "invalid_payload",
        }
    }
}
