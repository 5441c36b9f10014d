//! UseCase: オンライン一覧の配信（Presence Broadcaster）
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - PresenceBroadcaster::broadcast() メソッド
//!
//! ### なぜこのテストが必要か
//! - 全ての接続が「同一の」スナップショットを受け取ることを保証
//! - 配信に失敗した接続があっても残りの接続には届くことを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：複数接続への配信
//! - 異常系：閉じた接続が混ざっている場合
//! - エッジケース：接続が 0 件の場合

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    domain::{ConnectionId, Identity, OnlineSnapshot, OutboundEvent},
    infrastructure::ConnectionRegistry,
};

use super::delivery::deliver;

/// 配信結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceReport {
    pub snapshot: OnlineSnapshot,
    pub delivered: Vec<ConnectionId>,
}

/// オンライン一覧を全接続へ配信する
pub struct PresenceBroadcaster {
    registry: Arc<ConnectionRegistry>,
    /// 同時に走る配信を直列化し、後発のスナップショットが先に届かないようにする
    lock: Mutex<()>,
}

impl PresenceBroadcaster {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            registry,
            lock: Mutex::new(()),
        }
    }

    /// 接続確立後の配信
    pub async fn identity_connected(&self, identity: &Identity) -> PresenceReport {
        tracing::info!("'{}' is online", identity);
        self.broadcast().await
    }

    /// 接続終了後の配信
    pub async fn identity_disconnected(&self, identity: &Identity) -> PresenceReport {
        tracing::info!("'{}' is offline", identity);
        self.broadcast().await
    }

    /// 現在のオンライン一覧を、その一覧に含まれる全接続へ配信する
    pub async fn broadcast(&self) -> PresenceReport {
        let _guard = self.lock.lock().await;
        let (snapshot, connections) = self.registry.snapshot();
        let event = OutboundEvent::PresenceSnapshot(snapshot.clone());
        let delivered = deliver(&connections, &event);
        tracing::debug!(
            "Presence snapshot of {} identities delivered to {}/{} connection(s)",
            snapshot.len(),
            delivered.len(),
            connections.len()
        );
        PresenceReport {
            snapshot,
            delivered,
        }
    }

    /// 現在のオンライン一覧
    pub fn current(&self) -> OnlineSnapshot {
        self.registry.snapshot_identities()
    }
}
