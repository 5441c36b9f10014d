//! Infrastructure layer: concrete implementations behind the domain's interfaces.
//!
//! - `registry`, `subscriptions`, `typing`: concurrent in-memory state of the engine
//! - `store`: durable store implementations
//! - `auth`: authentication collaborator implementations
//! - `dto`: wire formats

pub mod auth;
pub mod dto;
pub mod registry;
pub mod store;
pub mod subscriptions;
pub mod typing;

pub use registry::ConnectionRegistry;
pub use subscriptions::RoomSubscriptions;
pub use typing::TypingTracker;
