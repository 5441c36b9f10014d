//! Server execution logic.

use std::sync::Arc;

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::usecase::ChatEngine;

use super::{
    handler::{create_room, health_check, list_online, list_rooms, list_users, websocket_handler},
    signal::shutdown_signal,
    state::AppState,
};

/// Chat relay server
///
/// # Example
///
/// ```ignore
/// let engine = Arc::new(ChatEngine::new(config, authenticator, store, clock));
/// Server::new(engine).run("127.0.0.1".to_string(), 3001).await?;
/// ```
pub struct Server {
    /// ChatEngine（接続ライフサイクルの入口）
    engine: Arc<ChatEngine>,
}

impl Server {
    pub fn new(engine: Arc<ChatEngine>) -> Self {
        Self { engine }
    }

    /// Build the router without binding a socket
    pub fn router(&self) -> Router {
        let app_state = Arc::new(AppState {
            engine: Arc::clone(&self.engine),
        });

        Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/api/online", get(list_online))
            .route("/api/users", get(list_users))
            .route("/api/rooms", get(list_rooms).post(create_room))
            .layer(TraceLayer::new_for_http())
            .with_state(app_state)
    }

    /// Run the chat relay server
    ///
    /// # Arguments
    ///
    /// * `host` - The host address to bind to (e.g., "127.0.0.1")
    /// * `port` - The port number to bind to (e.g., 3001)
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, host: String, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        let bind_addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&bind_addr).await?;

        tracing::info!("Chat relay server listening on {}", listener.local_addr()?);
        tracing::info!("Connect to: ws://{}/ws?token=<jwt>", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        self.serve(listener, shutdown_signal()).await?;

        tracing::info!("Server shutdown complete");

        Ok(())
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> std::io::Result<()> {
        let sweeper = self.engine.spawn_typing_sweeper();
        let app = self.router();

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await;

        sweeper.abort();
        result
    }
}
