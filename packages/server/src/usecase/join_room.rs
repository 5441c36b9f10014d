//! UseCase: ルーム参加（Room Membership View）
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - JoinRoomUseCase::execute() メソッド
//! - 永続ストアのメンバー判定を経た購読の追加
//!
//! ### なぜこのテストが必要か
//! - 参加に成功していないルームの fan-out を受け取ってはならない
//! - 再参加は副作用のない成功でなければならない
//!
//! ### どのような状況を想定しているか
//! - 正常系：メンバーの参加
//! - 異常系：非メンバーの参加、ストア障害・タイムアウト
//! - エッジケース：参加済みルームへの再参加

use std::{collections::HashSet, sync::Arc, time::Duration};

use crate::{
    domain::{ChatStore, Connection, RoomKey},
    infrastructure::RoomSubscriptions,
};

use super::{error::JoinError, timeout::store_call};

/// 1 接続がこのセッションで参加済みのルーム集合
///
/// 接続ごとに所有され、接続とともに破棄される。
#[derive(Debug, Default, Clone)]
pub struct RoomMembershipView {
    joined: HashSet<RoomKey>,
}

impl RoomMembershipView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, room: &RoomKey) -> bool {
        self.joined.contains(room)
    }

    pub fn rooms(&self) -> impl Iterator<Item = &RoomKey> {
        self.joined.iter()
    }

    pub fn len(&self) -> usize {
        self.joined.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joined.is_empty()
    }

    pub(crate) fn insert(&mut self, room: RoomKey) -> bool {
        self.joined.insert(room)
    }
}

/// 参加の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined,
    AlreadyJoined,
}

/// ルーム参加のユースケース
pub struct JoinRoomUseCase {
    /// ChatStore（永続ストアの抽象化）
    store: Arc<dyn ChatStore>,
    /// ルームごとの購読者
    subscriptions: Arc<RoomSubscriptions>,
    store_timeout: Duration,
}

impl JoinRoomUseCase {
    pub fn new(
        store: Arc<dyn ChatStore>,
        subscriptions: Arc<RoomSubscriptions>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            store,
            subscriptions,
            store_timeout,
        }
    }

    /// ルーム参加を実行
    ///
    /// # Returns
    ///
    /// * `Ok(JoinOutcome)` - 参加成功（参加済みの場合も成功）
    /// * `Err(JoinError)` - 非メンバー、またはメンバー判定に失敗（状態は変化しない）
    pub async fn execute(
        &self,
        connection: &Arc<Connection>,
        view: &mut RoomMembershipView,
        room: RoomKey,
    ) -> Result<JoinOutcome, JoinError> {
        // 1. 参加済みなら何もしない
        if view.contains(&room) {
            return Ok(JoinOutcome::AlreadyJoined);
        }

        // 2. 永続ストアでメンバー判定
        let user_id = &connection.identity().user_id;
        let is_member = store_call(self.store_timeout, self.store.is_member(user_id, &room))
            .await
            .map_err(|e| JoinError::MembershipCheckFailed {
                room: room.clone(),
                detail: e.to_string(),
            })?;
        if !is_member {
            return Err(JoinError::NotAMember(room));
        }

        // 3. 購読を追加
        self.subscribe(connection, view, room);
        Ok(JoinOutcome::Joined)
    }

    /// メンバー判定済みのルーム群を購読する（接続時の自動参加）
    pub fn subscribe_all(
        &self,
        connection: &Arc<Connection>,
        view: &mut RoomMembershipView,
        rooms: impl IntoIterator<Item = RoomKey>,
    ) {
        for room in rooms {
            self.subscribe(connection, view, room);
        }
    }

    /// 全ての購読を解除する（接続終了時）
    pub fn leave_all(&self, connection: &Connection, view: &RoomMembershipView) -> usize {
        self.subscriptions
            .unsubscribe_all(view.rooms(), connection.id())
    }

    fn subscribe(&self, connection: &Arc<Connection>, view: &mut RoomMembershipView, room: RoomKey) {
        self.subscriptions.subscribe(&room, connection);
        tracing::debug!(
            "'{}' joined room '{}'",
            connection.identity().user_id,
            room
        );
        view.insert(room);
    }
}
