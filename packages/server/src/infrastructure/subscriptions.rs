//! Room Subscriptions
//!
//! ルームごとの購読中接続の集合。ルーム宛て配信（fan-out）の配信先になる。
//!
//! ## 設計ノート
//!
//! 購読者集合は `Arc<HashMap>` の copy-on-write で保持します。
//! 配信側は `Arc` を複製して走査するため、走査中の join / leave は
//! 走査中の集合に影響しません。

use std::{collections::HashMap, sync::Arc};

use dashmap::DashMap;

use crate::domain::{Connection, ConnectionId, RoomKey};

type Subscribers = Arc<HashMap<ConnectionId, Arc<Connection>>>;

/// ルーム → 購読中接続
#[derive(Debug, Default)]
pub struct RoomSubscriptions {
    rooms: DashMap<RoomKey, Subscribers>,
}

impl RoomSubscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// 接続をルームに購読させる（既に購読済みなら false）
    pub fn subscribe(&self, room: &RoomKey, connection: &Arc<Connection>) -> bool {
        let mut entry = self.rooms.entry(room.clone()).or_default();
        if entry.contains_key(&connection.id()) {
            return false;
        }
        let mut next = HashMap::clone(&entry);
        next.insert(connection.id(), Arc::clone(connection));
        *entry = Arc::new(next);
        true
    }

    /// 接続の購読を解除する（購読していなければ false）
    pub fn unsubscribe(&self, room: &RoomKey, connection_id: ConnectionId) -> bool {
        let removed = match self.rooms.get_mut(room) {
            Some(mut entry) if entry.contains_key(&connection_id) => {
                let mut next = HashMap::clone(&entry);
                next.remove(&connection_id);
                *entry = Arc::new(next);
                true
            }
            _ => false,
        };
        self.rooms.remove_if(room, |_, subscribers| subscribers.is_empty());
        removed
    }

    /// 複数ルームの購読をまとめて解除する
    pub fn unsubscribe_all<'a>(
        &self,
        rooms: impl IntoIterator<Item = &'a RoomKey>,
        connection_id: ConnectionId,
    ) -> usize {
        rooms
            .into_iter()
            .filter(|room| self.unsubscribe(room, connection_id))
            .count()
    }

    /// 現時点の購読者一覧（呼び出し時点のコピー）
    pub fn subscribers(&self, room: &RoomKey) -> Vec<Arc<Connection>> {
        let snapshot: Option<Subscribers> = self.rooms.get(room).map(|entry| Arc::clone(&entry));
        snapshot
            .map(|subscribers| subscribers.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_subscribed(&self, room: &RoomKey, connection_id: ConnectionId) -> bool {
        self.rooms
            .get(room)
            .is_some_and(|entry| entry.contains_key(&connection_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Identity, UserId, Username};

    fn connection(id: &str) -> Arc<Connection> {
        Connection::open(Identity::new(
            UserId::new(id.to_string()).unwrap(),
            Username::new(id.to_string()).unwrap(),
        ))
        .0
    }

    fn room(key: &str) -> RoomKey {
        RoomKey::new(key.to_string()).unwrap()
    }

    #[test]
    fn test_subscribe_and_list_subscribers() {
        // テスト項目: 購読した接続が購読者一覧に含まれる
        // given (前提条件):
        let subscriptions = RoomSubscriptions::new();
        let alice = connection("alice");
        let bob = connection("bob");

        // when (操作):
        assert!(subscriptions.subscribe(&room("general"), &alice));
        assert!(subscriptions.subscribe(&room("general"), &bob));

        // then (期待する結果):
        let ids: Vec<ConnectionId> = subscriptions
            .subscribers(&room("general"))
            .iter()
            .map(|c| c.id())
            .collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&alice.id()));
        assert!(ids.contains(&bob.id()));
    }

    #[test]
    fn test_subscribe_twice_is_noop() {
        // テスト項目: 二重購読は何もしない
        // given (前提条件):
        let subscriptions = RoomSubscriptions::new();
        let alice = connection("alice");
        subscriptions.subscribe(&room("general"), &alice);

        // when (操作):
        let newly = subscriptions.subscribe(&room("general"), &alice);

        // then (期待する結果):
        assert!(!newly);
        assert_eq!(subscriptions.subscribers(&room("general")).len(), 1);
    }

    #[test]
    fn test_rooms_are_isolated() {
        // テスト項目: 別ルームの購読者は含まれない
        // given (前提条件):
        let subscriptions = RoomSubscriptions::new();
        subscriptions.subscribe(&room("a"), &connection("alice"));
        subscriptions.subscribe(&room("b"), &connection("bob"));

        // when (操作):
        let subscribers = subscriptions.subscribers(&room("a"));

        // then (期待する結果):
        assert_eq!(subscribers.len(), 1);
        assert_eq!(subscribers[0].identity().user_id.as_str(), "alice");
    }

    #[test]
    fn test_snapshot_is_unaffected_by_later_join() {
        // テスト項目: 取得済みの購読者一覧は後からの購読で変化しない
        // given (前提条件):
        let subscriptions = RoomSubscriptions::new();
        subscriptions.subscribe(&room("general"), &connection("alice"));
        let snapshot = subscriptions.subscribers(&room("general"));

        // when (操作):
        subscriptions.subscribe(&room("general"), &connection("bob"));

        // then (期待する結果):
        assert_eq!(snapshot.len(), 1);
        assert_eq!(subscriptions.subscribers(&room("general")).len(), 2);
    }

    #[test]
    fn test_unsubscribe_all_removes_connection_everywhere() {
        // テスト項目: unsubscribe_all で全ルームから購読が外れる
        // given (前提条件):
        let subscriptions = RoomSubscriptions::new();
        let alice = connection("alice");
        let rooms = vec![room("a"), room("b"), room("c")];
        for r in &rooms {
            subscriptions.subscribe(r, &alice);
        }

        // when (操作):
        let removed = subscriptions.unsubscribe_all(&rooms, alice.id());

        // then (期待する結果):
        assert_eq!(removed, 3);
        for r in &rooms {
            assert!(!subscriptions.is_subscribed(r, alice.id()));
            assert!(subscriptions.subscribers(r).is_empty());
        }
    }

    #[test]
    fn test_unsubscribe_unknown_room_returns_false() {
        // テスト項目: 購読していないルームの解除は false
        // given (前提条件):
        let subscriptions = RoomSubscriptions::new();

        // when (操作):
        let removed = subscriptions.unsubscribe(&room("nowhere"), ConnectionId::generate());

        // then (期待する結果):
        assert!(!removed);
    }
}
