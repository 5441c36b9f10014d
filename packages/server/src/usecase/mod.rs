//! UseCase 層
//!
//! - `join_room`: Room Membership View（ルーム参加）
//! - `send_message`: Message Router（メッセージ配信）
//! - `presence`: Presence Broadcaster（オンライン一覧の配信）
//! - `typing`: 入力中状態の更新と通知
//! - `rooms`: ルームの作成と一覧
//! - `lifecycle`: Connection Lifecycle Controller（上記を束ねる入口）

mod delivery;
pub mod error;
pub mod join_room;
pub mod lifecycle;
pub mod presence;
pub mod rooms;
pub mod send_message;
mod timeout;
pub mod typing;

pub use error::{ConnectError, JoinError, RoomError, RouteError, TypingError};
pub use join_room::{JoinOutcome, JoinRoomUseCase, RoomMembershipView};
pub use lifecycle::{Authenticated, ChatEngine, CloseOutcome, ConnectionState, Session};
pub use presence::{PresenceBroadcaster, PresenceReport};
pub use rooms::{MAX_ROOM_NAME_LENGTH, RoomDirectory};
pub use send_message::{Delivery, MessageRouter};
pub use typing::TypingUseCase;
