//! InMemory ChatStore 実装
//!
//! ドメイン層が定義する `ChatStore` trait の具体的な実装。
//! `HashMap` をインメモリ DB として使用します。
//!
//! 保持するもの:
//! - ユーザー（identity、オンラインフラグ、last_seen）
//! - ルーム（キー、名前、メンバー）
//! - メッセージ（追記のみのログ）

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use async_trait::async_trait;
use chatrelay_shared::time::Clock;
use tokio::sync::Mutex;

use crate::domain::{
    CanonicalMessage, ChatStore, Identity, MessageContent, MessageId, Room, RoomKey, StoreError,
    Target, Timestamp, UserId, UserPresence, ValueObjectError,
};

use super::StoreSeed;

#[derive(Debug, Default)]
struct StoreState {
    users: HashMap<UserId, UserPresence>,
    rooms: HashMap<RoomKey, Room>,
    messages: Vec<CanonicalMessage>,
}

impl StoreState {
    fn add_room(&mut self, room: Room) -> Result<Room, StoreError> {
        if self.rooms.contains_key(&room.key) {
            return Err(StoreError::RoomAlreadyExists(room.key.into_string()));
        }
        tracing::debug!(
            "Room '{}' created with {} members",
            room.key,
            room.members.len()
        );
        self.rooms.insert(room.key.clone(), room.clone());
        Ok(room)
    }

    fn user_entry(&mut self, identity: &Identity) -> &mut UserPresence {
        self.users
            .entry(identity.user_id.clone())
            .or_insert_with(|| UserPresence {
                identity: identity.clone(),
                is_online: false,
                last_seen: None,
            })
    }
}

/// インメモリ ChatStore 実装
pub struct InMemoryChatStore {
    state: Mutex<StoreState>,
    clock: Arc<dyn Clock>,
}

impl InMemoryChatStore {
    /// 空のストアを作成
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            clock,
        }
    }

    /// シードデータからストアを作成
    pub async fn from_seed(seed: StoreSeed, clock: Arc<dyn Clock>) -> Result<Self, ValueObjectError> {
        let store = Self::new(clock);
        for user in &seed.users {
            store.upsert_user(user.to_identity()?).await;
        }
        for room in &seed.rooms {
            let key = room.key()?;
            let members = room.member_ids()?;
            if let Err(e) = store.insert_room(key, room.name.clone(), members).await {
                tracing::warn!("Skipping seed room '{}': {}", room.id, e);
            }
        }
        Ok(store)
    }

    /// ユーザーを登録（既存なら username を更新）
    pub async fn upsert_user(&self, identity: Identity) {
        let mut state = self.state.lock().await;
        state
            .users
            .entry(identity.user_id.clone())
            .and_modify(|user| user.identity = identity.clone())
            .or_insert(UserPresence {
                identity,
                is_online: false,
                last_seen: None,
            });
    }

    /// 作成者なしでメンバーごとルームを登録（シードデータ用）
    pub async fn insert_room(
        &self,
        key: RoomKey,
        name: String,
        members: impl IntoIterator<Item = UserId>,
    ) -> Result<Room, StoreError> {
        let room = Room {
            key,
            name,
            created_by: None,
            members: members.into_iter().collect(),
            created_at: Timestamp::new(self.clock.now_millis()),
        };
        self.state.lock().await.add_room(room)
    }

    /// ルームを取得
    pub async fn room(&self, key: &RoomKey) -> Option<Room> {
        self.state.lock().await.rooms.get(key).cloned()
    }

    /// 保存済みの全メッセージ（保存順）
    pub async fn messages(&self) -> Vec<CanonicalMessage> {
        self.state.lock().await.messages.clone()
    }
}

#[async_trait]
impl ChatStore for InMemoryChatStore {
    async fn find_room_membership(
        &self,
        user_id: &UserId,
    ) -> Result<HashSet<RoomKey>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .rooms
            .values()
            .filter(|room| room.members.contains(user_id))
            .map(|room| room.key.clone())
            .collect())
    }

    async fn is_member(&self, user_id: &UserId, room: &RoomKey) -> Result<bool, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .rooms
            .get(room)
            .is_some_and(|room| room.members.contains(user_id)))
    }

    async fn save_message(
        &self,
        sender: &Identity,
        target: &Target,
        content: &MessageContent,
    ) -> Result<CanonicalMessage, StoreError> {
        let message = CanonicalMessage {
            id: MessageId::generate(),
            sender: sender.clone(),
            target: target.clone(),
            content: content.clone(),
            created_at: Timestamp::new(self.clock.now_millis()),
        };
        let mut state = self.state.lock().await;
        state.messages.push(message.clone());
        Ok(message)
    }

    async fn set_online(&self, identity: &Identity, online: bool) -> Result<(), StoreError> {
        let now = Timestamp::new(self.clock.now_millis());
        let mut state = self.state.lock().await;
        let user = state.user_entry(identity);
        user.is_online = online;
        if !online {
            user.last_seen = Some(now);
        }
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<UserPresence>, StoreError> {
        let state = self.state.lock().await;
        let mut users: Vec<UserPresence> = state.users.values().cloned().collect();
        users.sort_by(|a, b| a.identity.username.cmp(&b.identity.username));
        Ok(users)
    }

    async fn create_room(
        &self,
        creator: &Identity,
        key: RoomKey,
        name: String,
    ) -> Result<Room, StoreError> {
        let room = Room {
            key,
            name,
            created_by: Some(creator.user_id.clone()),
            members: HashSet::from([creator.user_id.clone()]),
            created_at: Timestamp::new(self.clock.now_millis()),
        };
        let mut state = self.state.lock().await;
        let room = state.add_room(room)?;
        state.user_entry(creator);
        Ok(room)
    }

    async fn find_rooms(&self, user_id: &UserId) -> Result<Vec<Room>, StoreError> {
        let state = self.state.lock().await;
        let mut rooms: Vec<Room> = state
            .rooms
            .values()
            .filter(|room| room.members.contains(user_id))
            .cloned()
            .collect();
        rooms.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(rooms)
    }
}
