//! Real-time chat relay server.
//!
//! Tracks who is online, routes chat messages to rooms or single peers and
//! relays typing indicators over WebSocket.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin chatrelay-server -- --jwt-secret dev-secret
//! cargo run --bin chatrelay-server -- --host 0.0.0.0 --port 3001 --seed seed.json
//! ```

use std::{sync::Arc, time::Duration};

use chatrelay_server::{
    EngineConfig,
    infrastructure::{
        auth::JwtAuthenticator,
        store::{InMemoryChatStore, StoreSeed},
    },
    ui::Server,
    usecase::ChatEngine,
};
use chatrelay_shared::{logger::setup_logger, time::SystemClock};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "chatrelay-server")]
#[command(about = "Real-time chat relay with presence and typing indicators", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "CHATRELAY_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "CHATRELAY_PORT", default_value = "3001")]
    port: u16,

    /// HMAC secret used to verify client tokens (HS256)
    #[arg(long, env = "CHATRELAY_JWT_SECRET", hide_env_values = true)]
    jwt_secret: String,

    /// JSON file with the initial users and rooms
    #[arg(long, env = "CHATRELAY_SEED")]
    seed: Option<std::path::PathBuf>,

    /// Maximum message length in characters
    #[arg(long, env = "CHATRELAY_MAX_MESSAGE_LENGTH", default_value = "2000")]
    max_message_length: usize,

    /// How long a typing indicator stays active without a refresh (milliseconds)
    #[arg(long, env = "CHATRELAY_TYPING_TTL_MS", default_value = "5000")]
    typing_ttl_ms: u64,

    /// Upper bound for one authentication call (milliseconds)
    #[arg(long, env = "CHATRELAY_AUTH_TIMEOUT_MS", default_value = "5000")]
    auth_timeout_ms: u64,

    /// Upper bound for one store call (milliseconds)
    #[arg(long, env = "CHATRELAY_STORE_TIMEOUT_MS", default_value = "5000")]
    store_timeout_ms: u64,

    /// Interval of the typing expiry sweep (milliseconds)
    #[arg(long, env = "CHATRELAY_TYPING_SWEEP_INTERVAL_MS", default_value = "1000")]
    typing_sweep_interval_ms: u64,
}

impl Args {
    fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            max_message_length: self.max_message_length,
            typing_ttl: Duration::from_millis(self.typing_ttl_ms),
            auth_timeout: Duration::from_millis(self.auth_timeout_ms),
            store_timeout: Duration::from_millis(self.store_timeout_ms),
            typing_sweep_interval: Duration::from_millis(self.typing_sweep_interval_ms),
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();

    // Initialize dependencies in order:
    // 1. Store
    // 2. Authenticator
    // 3. ChatEngine
    // 4. Server

    // 1. Create Store (in-memory, optionally seeded)
    let clock = Arc::new(SystemClock);
    let store = match &args.seed {
        Some(path) => {
            let seed = match StoreSeed::from_path(path) {
                Ok(seed) => seed,
                Err(e) => {
                    tracing::error!("Failed to read seed '{}': {}", path.display(), e);
                    std::process::exit(1);
                }
            };
            match InMemoryChatStore::from_seed(seed, clock.clone()).await {
                Ok(store) => store,
                Err(e) => {
                    tracing::error!("Invalid seed '{}': {}", path.display(), e);
                    std::process::exit(1);
                }
            }
        }
        None => {
            tracing::warn!("No seed given, starting with an empty store");
            InMemoryChatStore::new(clock.clone())
        }
    };

    // 2. Create Authenticator (JWT, HS256)
    let authenticator = JwtAuthenticator::new(args.jwt_secret.as_bytes());

    // 3. Create ChatEngine
    let config = args.engine_config();
    tracing::debug!("Engine config: {:?}", config);
    let engine = Arc::new(ChatEngine::new(
        config,
        Arc::new(authenticator),
        Arc::new(store),
        clock,
    ));

    // 4. Create and run the server
    let server = Server::new(engine);
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
