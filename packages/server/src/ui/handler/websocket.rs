//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::{
    domain::{InboundEvent, OutboundEvent, RejectReason},
    infrastructure::dto::websocket::{ClientEvent, ServerEvent},
    ui::state::AppState,
    usecase::{Authenticated, ConnectError, Session},
};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub token: Option<String>,
}

/// Authenticate before the upgrade; a rejected token never reaches the engine's registry.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let Some(token) = query.token else {
        tracing::warn!("WebSocket connection without token. Rejecting connection.");
        return Err(StatusCode::UNAUTHORIZED);
    };

    match state.engine.authenticate(&token).await {
        Ok(authenticated) => {
            tracing::info!("'{}' authenticated, upgrading", authenticated.identity());
            Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, authenticated)))
        }
        Err(e @ (ConnectError::Unauthenticated(_) | ConnectError::AuthTimeout)) => {
            tracing::warn!("Rejecting WebSocket connection: {}", e);
            Err(StatusCode::UNAUTHORIZED)
        }
        Err(e) => {
            tracing::error!("Rejecting WebSocket connection: {}", e);
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}

/// Serialize one event for the wire.
fn encode(event: ServerEvent) -> Option<Message> {
    match serde_json::to_string(&event) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            tracing::error!("Failed to serialize server event: {}", e);
            None
        }
    }
}

/// Spawns a task that receives events from the rx channel and pushes them to the WebSocket sender.
///
/// The task ends when the channel closes, a write fails, or the session is replaced by a
/// newer connection of the same identity (in which case the socket is closed).
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<OutboundEvent>,
    mut sender: SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let replaced = matches!(event, OutboundEvent::SessionReplaced);

            // Domain Model から DTO への変換
            if let Some(message) = encode(event.into()) {
                if sender.send(message).await.is_err() {
                    break;
                }
            }

            if replaced {
                let close = Message::Close(Some(CloseFrame {
                    code: close_code::POLICY,
                    reason: "session replaced".into(),
                }));
                let _ = sender.send(close).await;
                break;
            }
        }
    })
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, authenticated: Authenticated) {
    let (mut sender, mut receiver) = socket.split();
    let identity = authenticated.identity().clone();

    let (mut session, rx) = match state.engine.activate(authenticated).await {
        Ok(activated) => activated,
        Err(e) => {
            tracing::error!("Failed to activate '{}': {}", identity, e);
            let error = ServerEvent::Error {
                reason: e.reason().as_str().to_string(),
                message: e.to_string(),
            };
            if let Some(message) = encode(error) {
                let _ = sender.send(message).await;
            }
            let _ = sender.send(Message::Close(None)).await;
            return;
        }
    };

    let mut send_task = pusher_loop(rx, sender);

    // Events of this connection are handled one at a time, in arrival order
    loop {
        tokio::select! {
            msg = receiver.next() => {
                let msg = match msg {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => {
                        tracing::warn!("WebSocket error from '{}': {}", identity, e);
                        break;
                    }
                    None => break,
                };

                match msg {
                    Message::Text(text) => dispatch(&mut session, text.as_str()).await,
                    Message::Binary(_) => {
                        session.reject(RejectReason::InvalidPayload, "binary frames are not supported");
                    }
                    Message::Close(_) => {
                        tracing::info!("'{}' requested close", identity);
                        break;
                    }
                    // Ping/pong is handled automatically by the WebSocket protocol
                    _ => {}
                }
            }
            _ = &mut send_task => break,
        }
    }

    send_task.abort();
    let outcome = session.close().await;
    tracing::info!("'{}' disconnected ({:?})", identity, outcome);
}

/// Parse one text frame and hand it to the session.
async fn dispatch(session: &mut Session, text: &str) {
    let event = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!("Failed to parse message from '{}': {}", session.identity(), e);
            session.reject(RejectReason::InvalidPayload, e.to_string());
            return;
        }
    };

    // DTO から Domain Model への変換
    match InboundEvent::try_from(event) {
        Ok(event) => session.handle(event).await,
        Err(reason) => {
            tracing::warn!("Invalid event from '{}': {}", session.identity(), reason.as_str());
            session.reject(reason, "target must name exactly one valid room or recipient");
        }
    }
}
