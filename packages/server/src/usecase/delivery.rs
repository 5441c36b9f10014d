//! Best-effort push of one event to many connections.

use std::sync::Arc;

use crate::domain::{Connection, ConnectionId, OutboundEvent};

/// Push `event` to every connection, returning the ids it reached.
///
/// A closed connection is logged and skipped; it never aborts the rest.
pub(crate) fn deliver<'a>(
    connections: impl IntoIterator<Item = &'a Arc<Connection>>,
    event: &OutboundEvent,
) -> Vec<ConnectionId> {
    connections
        .into_iter()
        .filter_map(|connection| match connection.push(event.clone()) {
            Ok(()) => Some(connection.id()),
            Err(e) => {
                tracing::warn!(
                    "Failed to push event to '{}': {}",
                    connection.identity().user_id,
                    e
                );
                None
            }
        })
        .collect()
}
