//! Real-time chat relay: presence tracking and message routing over WebSocket.
//!
//! The engine keeps an authoritative map of connected identities, routes chat
//! messages to rooms or single peers, tracks typing indicators and broadcasts
//! presence snapshots. Authentication and durable storage are collaborators
//! behind the `Authenticator` and `ChatStore` traits.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

pub mod config;

pub use config::EngineConfig;
