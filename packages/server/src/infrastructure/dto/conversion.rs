//! Conversion logic between DTOs and domain types.

use chatrelay_shared::time::timestamp_to_rfc3339;

use crate::domain::{
    CanonicalMessage, Identity, InboundEvent, OnlineSnapshot, OutboundEvent, RejectReason, Room,
    RoomKey, Target, UserId, UserPresence,
};
use crate::infrastructure::dto::{http, websocket as dto};

// ========================================
// DTO → Domain
// ========================================

fn parse_target(
    kind: dto::MessageKind,
    room_id: Option<String>,
    recipient_id: Option<String>,
) -> Result<Target, RejectReason> {
    match (kind, room_id, recipient_id) {
        (dto::MessageKind::Room, Some(room_id), None) => RoomKey::new(room_id)
            .map(Target::Room)
            .map_err(|_| RejectReason::InvalidTarget),
        (dto::MessageKind::Private, None, Some(recipient_id)) => UserId::new(recipient_id)
            .map(Target::Direct)
            .map_err(|_| RejectReason::InvalidTarget),
        _ => Err(RejectReason::InvalidTarget),
    }
}

impl TryFrom<dto::ClientEvent> for InboundEvent {
    type Error = RejectReason;

    fn try_from(event: dto::ClientEvent) -> Result<Self, Self::Error> {
        match event {
            dto::ClientEvent::JoinRoom { room_id } => RoomKey::new(room_id)
                .map(InboundEvent::JoinRoom)
                .map_err(|_| RejectReason::InvalidTarget),
            dto::ClientEvent::SendMessage {
                content,
                message_type,
                room_id,
                recipient_id,
            } => Ok(InboundEvent::SendMessage {
                target: parse_target(message_type, room_id, recipient_id)?,
                content,
            }),
            dto::ClientEvent::TypingStart {
                message_type,
                room_id,
                recipient_id,
            } => parse_target(message_type, room_id, recipient_id).map(InboundEvent::TypingStart),
            dto::ClientEvent::TypingStop {
                message_type,
                room_id,
                recipient_id,
            } => parse_target(message_type, room_id, recipient_id).map(InboundEvent::TypingStop),
        }
    }
}

// ========================================
// Domain → DTO
// ========================================

impl From<&Identity> for dto::UserInfo {
    fn from(identity: &Identity) -> Self {
        Self {
            user_id: identity.user_id.as_str().to_string(),
            username: identity.username.as_str().to_string(),
        }
    }
}

impl From<CanonicalMessage> for dto::MessageInfo {
    fn from(message: CanonicalMessage) -> Self {
        let (message_type, room_id, recipient_id) = match message.target {
            Target::Room(room) => (dto::MessageKind::Room, Some(room.into_string()), None),
            Target::Direct(peer) => (dto::MessageKind::Private, None, Some(peer.into_string())),
        };
        Self {
            id: message.id.to_string(),
            content: message.content.into_string(),
            sender: dto::UserInfo::from(&message.sender),
            message_type,
            room_id,
            recipient_id,
            created_at: message.created_at.value(),
        }
    }
}

impl From<&OnlineSnapshot> for Vec<dto::UserInfo> {
    fn from(snapshot: &OnlineSnapshot) -> Self {
        snapshot.identities().iter().map(dto::UserInfo::from).collect()
    }
}

fn typing_info(typist: Identity, target: Target) -> dto::TypingInfo {
    let (room_id, sender_id) = match target {
        Target::Room(room) => (Some(room.into_string()), None),
        Target::Direct(_) => (None, Some(typist.user_id.as_str().to_string())),
    };
    dto::TypingInfo {
        user_id: typist.user_id.into_string(),
        username: typist.username.into_string(),
        room_id,
        sender_id,
    }
}

impl From<OutboundEvent> for dto::ServerEvent {
    fn from(event: OutboundEvent) -> Self {
        match event {
            OutboundEvent::MessageDelivered(message) => Self::ReceiveMessage {
                message: message.into(),
            },
            OutboundEvent::PresenceSnapshot(snapshot) => Self::UsersUpdated {
                users: (&snapshot).into(),
            },
            OutboundEvent::TypingStarted { typist, target } => {
                Self::UserTyping(typing_info(typist, target))
            }
            OutboundEvent::TypingStopped { typist, target } => {
                Self::UserStopTyping(typing_info(typist, target))
            }
            OutboundEvent::JoinAccepted(room) => Self::JoinedRoom {
                room_id: room.into_string(),
            },
            OutboundEvent::JoinRejected { room, reason } => Self::JoinRejected {
                room_id: room.into_string(),
                reason: reason.as_str().to_string(),
            },
            OutboundEvent::OperationRejected { reason, detail } => Self::Error {
                reason: reason.as_str().to_string(),
                message: detail,
            },
            OutboundEvent::SessionReplaced => Self::SessionReplaced,
        }
    }
}

impl From<&OnlineSnapshot> for http::OnlineUsersDto {
    fn from(snapshot: &OnlineSnapshot) -> Self {
        Self {
            count: snapshot.len(),
            users: snapshot.into(),
        }
    }
}

impl From<UserPresence> for http::UserPresenceDto {
    fn from(user: UserPresence) -> Self {
        Self {
            user_id: user.identity.user_id.into_string(),
            username: user.identity.username.into_string(),
            is_online: user.is_online,
            last_seen: user
                .last_seen
                .and_then(|last_seen| timestamp_to_rfc3339(last_seen.value())),
        }
    }
}

impl From<Room> for http::RoomDto {
    fn from(room: Room) -> Self {
        let mut members: Vec<String> = room
            .members
            .into_iter()
            .map(UserId::into_string)
            .collect();
        members.sort();
        Self {
            room_id: room.key.into_string(),
            name: room.name,
            created_by: room.created_by.map(UserId::into_string),
            members,
            created_at: room.created_at.value(),
        }
    }
}
