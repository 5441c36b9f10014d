//! Live connection handle.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::{ConnectionId, Identity, OutboundEvent, PushError};

/// Channel through which events reach one connection's transport task.
pub type PusherChannel = mpsc::UnboundedSender<OutboundEvent>;

/// A live transport endpoint bound to exactly one identity.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    identity: Identity,
    sender: PusherChannel,
}

impl Connection {
    pub fn new(identity: Identity, sender: PusherChannel) -> Self {
        Self {
            id: ConnectionId::generate(),
            identity,
            sender,
        }
    }

    /// Create a connection together with the receiving end of its channel.
    pub fn open(identity: Identity) -> (Arc<Self>, mpsc::UnboundedReceiver<OutboundEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Arc::new(Self::new(identity, sender)), receiver)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Queue an event for this connection.
    ///
    /// Fails only when the transport task has already gone away.
    pub fn push(&self, event: OutboundEvent) -> Result<(), PushError> {
        self.sender
            .send(event)
            .map_err(|_| PushError::ConnectionClosed(self.id))
    }
}
