//! Request handlers.

mod http;
mod websocket;

pub use http::{create_room, health_check, list_online, list_rooms, list_users};
pub use websocket::websocket_handler;
