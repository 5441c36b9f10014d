//! UseCase: 入力中通知
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - TypingUseCase の start / stop / clear_identity / sweep_expired
//!
//! ### なぜこのテストが必要か
//! - 通知は「相手側」だけに届き、入力者本人には届かないことを保証
//! - 期限切れ・切断時にも typing-stopped が届き、表示が残り続けないことを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：ルーム内の入力、1 対 1 の入力
//! - 異常系：未参加ルーム、自分宛て
//! - エッジケース：期限延長（再通知しない）、相手がオフライン

use std::sync::Arc;

use crate::{
    domain::{Connection, Identity, OutboundEvent, Target, TypingScope, UserId},
    infrastructure::{ConnectionRegistry, RoomSubscriptions, TypingTracker},
};

use super::{delivery::deliver, error::TypingError, join_room::RoomMembershipView};

/// 入力中状態の更新と通知のユースケース
pub struct TypingUseCase {
    tracker: Arc<TypingTracker>,
    registry: Arc<ConnectionRegistry>,
    subscriptions: Arc<RoomSubscriptions>,
}

impl TypingUseCase {
    pub fn new(
        tracker: Arc<TypingTracker>,
        registry: Arc<ConnectionRegistry>,
        subscriptions: Arc<RoomSubscriptions>,
    ) -> Self {
        Self {
            tracker,
            registry,
            subscriptions,
        }
    }

    /// 入力開始
    ///
    /// 新たに入力中になった場合だけ相手側へ typing-started を通知する。
    /// 入力中の再送は期限の延長のみ。
    pub fn start(
        &self,
        typist: &Connection,
        view: &RoomMembershipView,
        target: Target,
    ) -> Result<bool, TypingError> {
        let identity = typist.identity();
        let scope = self.scope(identity, view, &target)?;
        let started = self.tracker.start(scope, identity);
        if started {
            self.notify(OutboundEvent::TypingStarted {
                typist: identity.clone(),
                target,
            });
        }
        Ok(started)
    }

    /// 入力終了
    ///
    /// エントリが残っていた場合だけ typing-stopped を通知する。
    pub fn stop(
        &self,
        typist: &Connection,
        view: &RoomMembershipView,
        target: Target,
    ) -> Result<bool, TypingError> {
        let identity = typist.identity();
        let scope = self.scope(identity, view, &target)?;
        let stopped = self.tracker.stop(&scope, &identity.user_id);
        if stopped {
            self.notify(OutboundEvent::TypingStopped {
                typist: identity.clone(),
                target,
            });
        }
        Ok(stopped)
    }

    /// ユーザーの入力中状態を全て消去し、各スコープへ typing-stopped を通知する（切断時）
    pub fn clear_identity(&self, user_id: &UserId) -> usize {
        let cleared = self.tracker.clear_identity(user_id);
        self.announce_stopped(cleared)
    }

    /// 期限切れのエントリを削除し、typing-stopped を通知する（定期タスク）
    pub fn sweep_expired(&self) -> usize {
        let expired = self.tracker.sweep();
        if !expired.is_empty() {
            tracing::debug!("{} typing indicator(s) expired", expired.len());
        }
        self.announce_stopped(expired)
    }

    /// ターゲットで現在入力中のユーザー
    pub fn active_typists(&self, viewer: &UserId, target: &Target) -> Vec<Identity> {
        self.tracker
            .active_typists(&TypingScope::for_target(viewer, target))
    }

    fn scope(
        &self,
        identity: &Identity,
        view: &RoomMembershipView,
        target: &Target,
    ) -> Result<TypingScope, TypingError> {
        match target {
            Target::Room(room) if !view.contains(room) => {
                Err(TypingError::RoomNotJoined(room.clone()))
            }
            Target::Direct(peer) if peer == &identity.user_id => {
                Err(TypingError::SelfDirectMessage)
            }
            _ => Ok(TypingScope::for_target(&identity.user_id, target)),
        }
    }

    fn announce_stopped(&self, entries: Vec<(TypingScope, Identity)>) -> usize {
        let count = entries.len();
        for (scope, typist) in entries {
            let target = scope.target_for(&typist.user_id);
            self.notify(OutboundEvent::TypingStopped { typist, target });
        }
        count
    }

    /// 入力者以外の関係者へ通知する
    ///
    /// - ルーム：入力者を除く購読者
    /// - 1 対 1：相手の接続（オンラインなら）
    fn notify(&self, event: OutboundEvent) {
        let (typist, target) = match &event {
            OutboundEvent::TypingStarted { typist, target }
            | OutboundEvent::TypingStopped { typist, target } => (typist, target),
            _ => return,
        };
        let recipients: Vec<Arc<Connection>> = match target {
            Target::Room(room) => self
                .subscriptions
                .subscribers(room)
                .into_iter()
                .filter(|connection| connection.identity().user_id != typist.user_id)
                .collect(),
            Target::Direct(peer) => self.registry.lookup(peer).into_iter().collect(),
        };
        deliver(&recipients, &event);
    }
}
