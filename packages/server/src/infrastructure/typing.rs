//! Typing State Tracker
//!
//! 「誰がどこで入力中か」を保持する自己失効型のストア。
//!
//! - `start` で有効期限を設定・延長、`stop` で即時削除
//! - 読み取り時に期限切れのエントリを除外（lazy check）
//! - `sweep` で期限切れエントリを一括削除（定期タスクから呼ばれる）
//!
//! 期限は `Clock` から計算するため、テストでは `ManualClock` で時間を進められます。

use std::{collections::HashMap, sync::Arc, time::Duration};

use chatrelay_shared::time::Clock;
use dashmap::DashMap;

use crate::domain::{Identity, TypingScope, UserId};

#[derive(Debug, Clone)]
struct TypingEntry {
    identity: Identity,
    expires_at: i64,
}

/// スコープごとの入力中ユーザー
pub struct TypingTracker {
    entries: DashMap<TypingScope, HashMap<UserId, TypingEntry>>,
    ttl_millis: i64,
    clock: Arc<dyn Clock>,
}

impl TypingTracker {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl_millis: i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX),
            clock,
        }
    }

    /// 入力開始（既に入力中なら期限を延長）
    ///
    /// 新規に入力中になった場合 `true`。
    pub fn start(&self, scope: TypingScope, identity: &Identity) -> bool {
        let now = self.clock.now_millis();
        let entry = TypingEntry {
            identity: identity.clone(),
            expires_at: now.saturating_add(self.ttl_millis),
        };
        let previous = self
            .entries
            .entry(scope)
            .or_default()
            .insert(identity.user_id.clone(), entry);
        previous.is_none_or(|previous| previous.expires_at <= now)
    }

    /// 入力終了（エントリが残っていた場合 `true`）
    pub fn stop(&self, scope: &TypingScope, user_id: &UserId) -> bool {
        let removed = self
            .entries
            .get_mut(scope)
            .and_then(|mut typists| typists.remove(user_id))
            .is_some();
        self.entries.remove_if(scope, |_, typists| typists.is_empty());
        removed
    }

    /// スコープ内で現在入力中のユーザー（期限切れは含まない、user_id 順）
    pub fn active_typists(&self, scope: &TypingScope) -> Vec<Identity> {
        let now = self.clock.now_millis();
        let mut typists: Vec<Identity> = self
            .entries
            .get(scope)
            .map(|typists| {
                typists
                    .values()
                    .filter(|entry| entry.expires_at > now)
                    .map(|entry| entry.identity.clone())
                    .collect()
            })
            .unwrap_or_default();
        typists.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        typists
    }

    /// 期限切れのエントリを削除し、削除したものを返す
    pub fn sweep(&self) -> Vec<(TypingScope, Identity)> {
        let now = self.clock.now_millis();
        self.remove_where(|entry| entry.expires_at <= now)
    }

    /// ユーザーの全エントリを削除し、削除したものを返す
    pub fn clear_identity(&self, user_id: &UserId) -> Vec<(TypingScope, Identity)> {
        self.remove_where(|entry| &entry.identity.user_id == user_id)
    }

    fn remove_where(&self, predicate: impl Fn(&TypingEntry) -> bool) -> Vec<(TypingScope, Identity)> {
        let mut removed = Vec::new();
        self.entries.retain(|scope, typists| {
            typists.retain(|_, entry| {
                if predicate(entry) {
                    removed.push((scope.clone(), entry.identity.clone()));
                    false
                } else {
                    true
                }
            });
            !typists.is_empty()
        });
        removed
    }
}
