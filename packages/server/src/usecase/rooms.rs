//! UseCase: ルームの作成と一覧
//!
//! 作成者は最初のメンバーになる。作成しただけでは購読は増えず、
//! ライブ接続で配信を受けるには join が必要。
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - RoomDirectory::create() / rooms_of() メソッド
//!
//! ### なぜこのテストが必要か
//! - シードなしで起動したサーバーでもルームを作って参加できることを保証
//! - 既存ルームのキーを奪えないことを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：作成と一覧
//! - 異常系：キーの重複、不正な名前、ストア障害
//! - エッジケース：前後の空白だけの名前

use std::{sync::Arc, time::Duration};

use crate::domain::{ChatStore, Identity, Room, RoomKey, StoreError, UserId};

use super::{error::RoomError, timeout::store_call};

/// ルーム名の最大文字数
pub const MAX_ROOM_NAME_LENGTH: usize = 100;

/// ルームの作成と一覧のユースケース
pub struct RoomDirectory {
    /// ChatStore（永続ストアの抽象化）
    store: Arc<dyn ChatStore>,
    store_timeout: Duration,
}

impl RoomDirectory {
    pub fn new(store: Arc<dyn ChatStore>, store_timeout: Duration) -> Self {
        Self {
            store,
            store_timeout,
        }
    }

    /// ルームを作成し、作成者を最初のメンバーにする
    ///
    /// 名前は前後の空白を除いて保存する。
    pub async fn create(
        &self,
        creator: &Identity,
        key: RoomKey,
        name: String,
    ) -> Result<Room, RoomError> {
        let name = name.trim();
        if name.is_empty() || name.chars().count() > MAX_ROOM_NAME_LENGTH {
            return Err(RoomError::InvalidName(MAX_ROOM_NAME_LENGTH));
        }

        let room = store_call(
            self.store_timeout,
            self.store.create_room(creator, key.clone(), name.to_string()),
        )
        .await
        .map_err(|e| match e {
            StoreError::RoomAlreadyExists(_) => RoomError::AlreadyExists(key),
            other => RoomError::StoreUnavailable(other.to_string()),
        })?;

        tracing::info!("'{}' created room '{}'", creator, room.key);
        Ok(room)
    }

    /// ユーザーが所属する全ルーム
    pub async fn rooms_of(&self, user_id: &UserId) -> Result<Vec<Room>, RoomError> {
        store_call(self.store_timeout, self.store.find_rooms(user_id))
            .await
            .map_err(|e| RoomError::StoreUnavailable(e.to_string()))
    }
}
