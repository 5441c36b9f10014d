//! Events crossing the transport boundary.

use super::{CanonicalMessage, Identity, OnlineSnapshot, RejectReason, RoomKey, Target};

/// Client action accepted by an active session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    JoinRoom(RoomKey),
    SendMessage { target: Target, content: String },
    TypingStart(Target),
    TypingStop(Target),
}

/// Event pushed to a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundEvent {
    MessageDelivered(CanonicalMessage),
    PresenceSnapshot(OnlineSnapshot),
    TypingStarted { typist: Identity, target: Target },
    TypingStopped { typist: Identity, target: Target },
    JoinAccepted(RoomKey),
    JoinRejected { room: RoomKey, reason: RejectReason },
    OperationRejected { reason: RejectReason, detail: String },
    /// The identity connected again elsewhere; this connection must close.
    SessionReplaced,
}
