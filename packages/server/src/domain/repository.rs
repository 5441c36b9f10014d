//! Repository trait 定義
//!
//! ドメイン層が必要とする永続ストアへのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

use std::collections::HashSet;

use async_trait::async_trait;

use super::{
    CanonicalMessage, Identity, MessageContent, Room, RoomKey, StoreError, Target, UserId,
    UserPresence,
};

/// 永続ストア trait
///
/// ユーザー・ルーム・メッセージを保持する外部ストアへのインターフェース。
/// エンジンはこの trait を通してのみルーム所属を読み、配信済みメッセージを書き込む。
/// 全ての呼び出しは失敗・タイムアウトしうる（タイムアウトは呼び出し側で付与する）。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// ユーザーが所属する全ルームを取得
    async fn find_room_membership(&self, user_id: &UserId)
    -> Result<HashSet<RoomKey>, StoreError>;

    /// ユーザーがルームのメンバーかどうか（存在しないルームは false）
    async fn is_member(&self, user_id: &UserId, room: &RoomKey) -> Result<bool, StoreError>;

    /// メッセージを保存し、ストアが採番した正規メッセージを返す
    async fn save_message(
        &self,
        sender: &Identity,
        target: &Target,
        content: &MessageContent,
    ) -> Result<CanonicalMessage, StoreError>;

    /// オンラインフラグを更新（オフライン化の際は last_seen も記録）
    async fn set_online(&self, identity: &Identity, online: bool) -> Result<(), StoreError>;

    /// ストアが知っている全ユーザーとその永続プレゼンスを取得
    async fn list_users(&self) -> Result<Vec<UserPresence>, StoreError>;

    /// ルームを作成し、作成者を最初のメンバーにする
    ///
    /// 同じキーのルームが既にある場合は `StoreError::RoomAlreadyExists`。
    async fn create_room(
        &self,
        creator: &Identity,
        key: RoomKey,
        name: String,
    ) -> Result<Room, StoreError>;

    /// ユーザーが所属する全ルーム（キー順）
    async fn find_rooms(&self, user_id: &UserId) -> Result<Vec<Room>, StoreError>;
}
