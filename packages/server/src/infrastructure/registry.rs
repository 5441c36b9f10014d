//! Connection Registry
//!
//! ## 責務
//!
//! - identity と live connection の対応を保持する唯一の情報源
//! - 同一 identity の再接続は後勝ち（置き換えられた接続を返す）
//! - 登録解除は compare-and-delete（古い切断イベントが新しい接続を消さない）
//!
//! ## 並行性
//!
//! `DashMap` のシャードロックにより、操作は identity 単位でアトミック。
//! 無関係な identity 同士は競合しない。
//!
//! `DashMap::iter` はシャードを 1 つずつロックするため、走査中の登録・解除が
//! 一部のシャードにだけ反映されうる。`gate` で走査と変更を排他にし、
//! スナップショットをある一時点の状態にする（変更同士は共有ロックで並行）。

use std::sync::{Arc, PoisonError, RwLock};

use dashmap::DashMap;

use crate::domain::{Connection, ConnectionId, OnlineSnapshot, UserId};

/// identity → connection の並行安全なマップ
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: DashMap<UserId, Arc<Connection>>,
    /// 変更は read、スナップショットの走査は write で取得する
    gate: RwLock<()>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 接続を登録し、置き換えられた接続があれば返す
    ///
    /// 同じ接続を二度登録した場合は何も置き換えない。
    pub fn register(&self, connection: Arc<Connection>) -> Option<Arc<Connection>> {
        let user_id = connection.identity().user_id.clone();
        let connection_id = connection.id();
        let previous = {
            let _gate = self.gate.read().unwrap_or_else(PoisonError::into_inner);
            self.connections.insert(user_id.clone(), connection)
        };
        tracing::debug!("Connection {} registered for '{}'", connection_id, user_id);
        previous.filter(|displaced| displaced.id() != connection_id)
    }

    /// 現在の接続が `connection_id` の場合に限り登録を解除する
    ///
    /// 解除した場合 `true`、既に別の接続に置き換わっていた場合 `false`。
    pub fn unregister(&self, user_id: &UserId, connection_id: ConnectionId) -> bool {
        let removed = {
            let _gate = self.gate.read().unwrap_or_else(PoisonError::into_inner);
            self.connections
                .remove_if(user_id, |_, current| current.id() == connection_id)
                .is_some()
        };
        if removed {
            tracing::debug!("Connection {} unregistered for '{}'", connection_id, user_id);
        } else {
            tracing::debug!(
                "Ignoring stale unregister of connection {} for '{}'",
                connection_id,
                user_id
            );
        }
        removed
    }

    /// identity の live connection を取得（オフラインなら None）
    pub fn lookup(&self, user_id: &UserId) -> Option<Arc<Connection>> {
        self.connections
            .get(user_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// 登録中の全接続と、それから導出したオンラインスナップショット
    ///
    /// 一度の走査から両方を作るので、スナップショットと配信先は必ず一致する。
    /// 走査中は登録・解除を止めるので、結果はある一時点の Registry と一致する。
    pub fn snapshot(&self) -> (OnlineSnapshot, Vec<Arc<Connection>>) {
        let connections: Vec<Arc<Connection>> = {
            let _gate = self.gate.write().unwrap_or_else(PoisonError::into_inner);
            self.connections
                .iter()
                .map(|entry| Arc::clone(entry.value()))
                .collect()
        };
        let snapshot = OnlineSnapshot::new(
            connections
                .iter()
                .map(|connection| connection.identity().clone())
                .collect(),
        );
        (snapshot, connections)
    }

    /// 現在オンラインの identity 一覧
    pub fn snapshot_identities(&self) -> OnlineSnapshot {
        self.snapshot().0
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
