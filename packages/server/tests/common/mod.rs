//! Shared helpers for in-process server tests.

#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc, time::Duration};

use chatrelay_server::{
    EngineConfig,
    domain::{Identity, UserId, Username},
    infrastructure::{
        auth::{JwtAuthenticator, issue_token},
        dto::websocket::{ClientEvent, ServerEvent},
        store::{InMemoryChatStore, StoreSeed},
    },
    ui::Server,
    usecase::ChatEngine,
};
use chatrelay_shared::time::SystemClock;
use futures_util::{SinkExt, StreamExt};
use tokio::{net::TcpStream, task::JoinHandle};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

pub const SECRET: &[u8] = b"integration-secret";

const SEED: &str = r#"{
    "users": [
        {"id": "u1", "username": "alice"},
        {"id": "u2", "username": "bob"},
        {"id": "u3", "username": "carol"}
    ],
    "rooms": [
        {"id": "general", "name": "General", "members": ["u1", "u2"]},
        {"id": "random", "name": "Random", "members": ["u1"]}
    ]
}"#;

/// Helper struct to manage an in-process server on an ephemeral port
pub struct TestServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Self {
        let clock = Arc::new(SystemClock);
        let seed = StoreSeed::from_json(SEED).expect("Failed to parse seed");
        let store = InMemoryChatStore::from_seed(seed, clock.clone())
            .await
            .expect("Invalid seed");
        let engine = Arc::new(ChatEngine::new(
            EngineConfig::default(),
            Arc::new(JwtAuthenticator::new(SECRET)),
            Arc::new(store),
            clock,
        ));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get local addr");
        let handle = tokio::spawn(async move {
            let _ = Server::new(engine)
                .serve(listener, std::future::pending())
                .await;
        });

        TestServer { addr, handle }
    }

    /// Get the WebSocket URL for this server
    pub fn ws_url(&self, token: &str) -> String {
        format!("ws://{}/ws?token={}", self.addr, token)
    }

    /// Get an HTTP URL for this server
    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub fn token_for(id: &str, name: &str) -> String {
    let identity = Identity::new(
        UserId::new(id.to_string()).expect("valid user id"),
        Username::new(name.to_string()).expect("valid username"),
    );
    issue_token(SECRET, &identity, 3600).expect("Failed to issue token")
}

/// Helper struct wrapping one WebSocket client connection
pub struct TestClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestClient {
    pub async fn connect(server: &TestServer, id: &str, name: &str) -> Self {
        let (stream, _) = connect_async(server.ws_url(&token_for(id, name)))
            .await
            .expect("Failed to connect");
        TestClient { stream }
    }

    pub async fn send(&mut self, event: &ClientEvent) {
        let json = serde_json::to_string(event).expect("Failed to serialize");
        self.stream
            .send(Message::text(json))
            .await
            .expect("Failed to send");
    }

    pub async fn send_raw(&mut self, text: &str) {
        self.stream
            .send(Message::text(text.to_string()))
            .await
            .expect("Failed to send");
    }

    /// Receive the next server event, or `None` on close / timeout
    pub async fn recv(&mut self, timeout: Duration) -> Option<ServerEvent> {
        loop {
            let frame = tokio::time::timeout(timeout, self.stream.next()).await.ok()??;
            match frame.ok()? {
                Message::Text(text) => {
                    return Some(serde_json::from_str(text.as_str()).expect("Invalid server event"));
                }
                Message::Close(_) => return None,
                _ => continue,
            }
        }
    }

    /// Receive events until one matches, skipping the rest
    pub async fn recv_until(
        &mut self,
        predicate: impl Fn(&ServerEvent) -> bool,
    ) -> Option<ServerEvent> {
        while let Some(event) = self.recv(Duration::from_secs(2)).await {
            if predicate(&event) {
                return Some(event);
            }
        }
        None
    }

    /// Collect everything that arrives within `window`
    pub async fn drain(&mut self, window: Duration) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.recv(window).await {
            events.push(event);
        }
        events
    }

    pub async fn close(mut self) {
        let _ = self.stream.close(None).await;
    }
}

pub fn online_ids(event: &ServerEvent) -> Option<Vec<String>> {
    match event {
        ServerEvent::UsersUpdated { users } => {
            Some(users.iter().map(|u| u.user_id.clone()).collect())
        }
        _ => None,
    }
}
