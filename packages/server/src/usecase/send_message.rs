//! UseCase: メッセージ送信処理（Message Router）
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - MessageRouter::route() メソッド
//! - 入力検証 → 永続化 → 配信先の解決 → 配信 の順序
//!
//! ### なぜこのテストが必要か
//! - 全受信者がストアの正規メッセージ（同一の ID・時刻）を受け取ることを保証
//! - ルーム宛ては「送信時点で参加中の接続」だけに届くことを保証
//! - 1 対 1 は相手がオフラインでも送信者に 1 通返ることを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：ルーム宛て、1 対 1（相手オンライン / オフライン）
//! - 異常系：空メッセージ、長すぎるメッセージ、自分宛て、未参加ルーム、永続化失敗
//! - エッジケース：送信後に参加した接続には届かない

use std::{sync::Arc, time::Duration};

use crate::{
    domain::{CanonicalMessage, ChatStore, Connection, ConnectionId, MessageContent, OutboundEvent, Target},
    infrastructure::{ConnectionRegistry, RoomSubscriptions},
};

use super::{
    delivery::deliver, error::RouteError, join_room::RoomMembershipView, timeout::store_call,
};

/// 配信結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// ストアが採番した正規メッセージ
    pub message: CanonicalMessage,
    /// 実際に配信できた接続
    pub recipients: Vec<ConnectionId>,
}

/// メッセージ送信のユースケース
pub struct MessageRouter {
    /// ChatStore（永続ストアの抽象化）
    store: Arc<dyn ChatStore>,
    registry: Arc<ConnectionRegistry>,
    subscriptions: Arc<RoomSubscriptions>,
    max_message_length: usize,
    store_timeout: Duration,
}

impl MessageRouter {
    pub fn new(
        store: Arc<dyn ChatStore>,
        registry: Arc<ConnectionRegistry>,
        subscriptions: Arc<RoomSubscriptions>,
        max_message_length: usize,
        store_timeout: Duration,
    ) -> Self {
        Self {
            store,
            registry,
            subscriptions,
            max_message_length,
            store_timeout,
        }
    }

    /// メッセージ送信を実行
    ///
    /// # Arguments
    ///
    /// * `sender` - 送信者の接続
    /// * `view` - 送信者が参加中のルーム
    /// * `target` - 宛先（ルーム or 1 対 1）
    /// * `content` - メッセージ本文（未検証）
    ///
    /// # Returns
    ///
    /// * `Ok(Delivery)` - 永続化成功（オフラインの受信者がいても成功）
    /// * `Err(RouteError)` - 入力検証エラー、または永続化失敗（誰にも配信されない）
    pub async fn route(
        &self,
        sender: &Arc<Connection>,
        view: &RoomMembershipView,
        target: Target,
        content: String,
    ) -> Result<Delivery, RouteError> {
        // 1. 入力検証（永続化・配信の前）
        let content = MessageContent::parse(content, self.max_message_length)?;
        self.validate_target(sender, view, &target)?;

        // 2. 永続化し、正規メッセージを得る
        let identity = sender.identity();
        let message = store_call(
            self.store_timeout,
            self.store.save_message(identity, &target, &content),
        )
        .await
        .map_err(|e| {
            tracing::error!("Failed to persist message from '{}': {}", identity.user_id, e);
            RouteError::PersistFailure(e.to_string())
        })?;

        // 3. 配信先を解決
        let recipients = self.resolve_recipients(sender, &message.target);

        // 4. 配信（個々の失敗は全体を失敗させない）
        let event = OutboundEvent::MessageDelivered(message.clone());
        let recipients = deliver(&recipients, &event);
        tracing::debug!(
            "Message {} from '{}' delivered to {} connection(s)",
            message.id,
            identity.user_id,
            recipients.len()
        );

        Ok(Delivery {
            message,
            recipients,
        })
    }

    fn validate_target(
        &self,
        sender: &Connection,
        view: &RoomMembershipView,
        target: &Target,
    ) -> Result<(), RouteError> {
        match target {
            Target::Room(room) if !view.contains(room) => Err(RouteError::RoomNotJoined(room.clone())),
            Target::Direct(peer) if peer == &sender.identity().user_id => {
                Err(RouteError::SelfDirectMessage)
            }
            _ => Ok(()),
        }
    }

    /// 配信先の接続を求める
    ///
    /// - ルーム宛て：現在そのルームを購読している接続
    /// - 1 対 1：相手の接続（オンラインなら）と送信者自身の接続
    fn resolve_recipients(&self, sender: &Arc<Connection>, target: &Target) -> Vec<Arc<Connection>> {
        match target {
            Target::Room(room) => self.subscriptions.subscribers(room),
            Target::Direct(peer) => {
                let mut recipients = Vec::with_capacity(2);
                match self.registry.lookup(peer) {
                    Some(connection) => recipients.push(connection),
                    None => tracing::debug!("Recipient '{}' is offline, echoing to sender only", peer),
                }
                recipients.push(Arc::clone(sender));
                recipients
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{
            Identity, MockChatStore, RoomKey, StoreError, Timestamp, UserId, Username,
        },
        infrastructure::store::InMemoryChatStore,
        usecase::join_room::JoinRoomUseCase,
    };
    use chatrelay_shared::time::FixedClock;
    use tokio::sync::mpsc::UnboundedReceiver;

    const MAX_LEN: usize = 20;

    struct Fixture {
        store: Arc<InMemoryChatStore>,
        registry: Arc<ConnectionRegistry>,
        subscriptions: Arc<RoomSubscriptions>,
        router: MessageRouter,
        joiner: JoinRoomUseCase,
    }

    fn identity(id: &str) -> Identity {
        Identity::new(
            UserId::new(id.to_string()).unwrap(),
            Username::new(id.to_string()).unwrap(),
        )
    }

    fn room(key: &str) -> RoomKey {
        RoomKey::new(key.to_string()).unwrap()
    }

    async fn create_fixture() -> Fixture {
        let store = Arc::new(InMemoryChatStore::new(Arc::new(FixedClock::new(1_000))));
        store
            .insert_room(
                room("general"),
                "General".to_string(),
                ["alice", "bob", "charlie"].map(|id| UserId::new(id.to_string()).unwrap()),
            )
            .await
            .unwrap();
        let registry = Arc::new(ConnectionRegistry::new());
        let subscriptions = Arc::new(RoomSubscriptions::new());
        let router = MessageRouter::new(
            store.clone(),
            registry.clone(),
            subscriptions.clone(),
            MAX_LEN,
            Duration::from_secs(1),
        );
        let joiner = JoinRoomUseCase::new(store.clone(), subscriptions.clone(), Duration::from_secs(1));
        Fixture {
            store,
            registry,
            subscriptions,
            router,
            joiner,
        }
    }

    fn online(
        fixture: &Fixture,
        id: &str,
    ) -> (Arc<Connection>, UnboundedReceiver<OutboundEvent>, RoomMembershipView) {
        let (connection, rx) = Connection::open(identity(id));
        fixture.registry.register(connection.clone());
        (connection, rx, RoomMembershipView::new())
    }

    fn delivered(rx: &mut UnboundedReceiver<OutboundEvent>) -> Vec<CanonicalMessage> {
        let mut messages = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let OutboundEvent::MessageDelivered(message) = event {
                messages.push(message);
            }
        }
        messages
    }

    #[tokio::test]
    async fn test_room_fanout_reaches_joined_connections_only() {
        // テスト項目: ルーム宛ては送信時点の参加者全員（送信者含む）にだけ届く
        // given (前提条件):
        let fixture = create_fixture().await;
        let (alice, mut alice_rx, mut alice_view) = online(&fixture, "alice");
        let (bob, mut bob_rx, mut bob_view) = online(&fixture, "bob");
        let (_charlie, mut charlie_rx, _charlie_view) = online(&fixture, "charlie");
        fixture.joiner.execute(&alice, &mut alice_view, room("general")).await.unwrap();
        fixture.joiner.execute(&bob, &mut bob_view, room("general")).await.unwrap();

        // when (操作): charlie は未参加のまま alice が送信
        let delivery = fixture
            .router
            .route(&alice, &alice_view, Target::Room(room("general")), "hello".to_string())
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(delivery.recipients.len(), 2);
        assert!(delivery.recipients.contains(&alice.id()));
        assert!(delivery.recipients.contains(&bob.id()));
        assert_eq!(delivered(&mut alice_rx), vec![delivery.message.clone()]);
        assert_eq!(delivered(&mut bob_rx), vec![delivery.message.clone()]);
        assert!(delivered(&mut charlie_rx).is_empty());
    }

    #[tokio::test]
    async fn test_join_after_send_is_not_retroactive() {
        // テスト項目: 送信後に参加した接続は過去のメッセージを受け取らない
        // given (前提条件):
        let fixture = create_fixture().await;
        let (alice, _alice_rx, mut alice_view) = online(&fixture, "alice");
        let (bob, mut bob_rx, mut bob_view) = online(&fixture, "bob");
        fixture.joiner.execute(&alice, &mut alice_view, room("general")).await.unwrap();
        fixture
            .router
            .route(&alice, &alice_view, Target::Room(room("general")), "early".to_string())
            .await
            .unwrap();

        // when (操作):
        fixture.joiner.execute(&bob, &mut bob_view, room("general")).await.unwrap();

        // then (期待する結果):
        assert!(delivered(&mut bob_rx).is_empty());
        assert_eq!(fixture.subscriptions.subscribers(&room("general")).len(), 2);
    }

    #[tokio::test]
    async fn test_direct_message_reaches_peer_and_sender_identically() {
        // テスト項目: 1 対 1 は相手と送信者に同一の正規メッセージが 1 通ずつ届く
        // given (前提条件):
        let fixture = create_fixture().await;
        let (alice, mut alice_rx, alice_view) = online(&fixture, "alice");
        let (bob, mut bob_rx, _bob_view) = online(&fixture, "bob");

        // when (操作):
        let delivery = fixture
            .router
            .route(&alice, &alice_view, Target::Direct(bob.identity().user_id.clone()), "hello".to_string())
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(delivery.recipients.len(), 2);
        let to_alice = delivered(&mut alice_rx);
        let to_bob = delivered(&mut bob_rx);
        assert_eq!(to_alice.len(), 1);
        assert_eq!(to_bob.len(), 1);
        assert_eq!(to_alice[0], to_bob[0]);
        assert_eq!(to_bob[0].content.as_str(), "hello");
        assert_eq!(to_bob[0].created_at, Timestamp::new(1_000));
    }

    #[tokio::test]
    async fn test_direct_message_to_offline_peer_echoes_and_persists() {
        // テスト項目: 相手がオフラインでも送信者に 1 通返り、エラーにならず永続化される
        // given (前提条件):
        let fixture = create_fixture().await;
        let (alice, mut alice_rx, alice_view) = online(&fixture, "alice");

        // when (操作):
        let delivery = fixture
            .router
            .route(&alice, &alice_view, Target::Direct(UserId::new("bob".to_string()).unwrap()), "are you there?".to_string())
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(delivery.recipients, vec![alice.id()]);
        assert_eq!(delivered(&mut alice_rx).len(), 1);
        assert_eq!(fixture.store.messages().await, vec![delivery.message]);
    }

    #[tokio::test]
    async fn test_self_direct_message_is_rejected_and_not_persisted() {
        // テスト項目: 自分宛ての 1 対 1 は SelfDirectMessage で拒否され、永続化されない
        // given (前提条件):
        let fixture = create_fixture().await;
        let (alice, _alice_rx, alice_view) = online(&fixture, "alice");

        // when (操作):
        let result = fixture
            .router
            .route(&alice, &alice_view, Target::Direct(alice.identity().user_id.clone()), "me".to_string())
            .await;

        // then (期待する結果):
        assert_eq!(result, Err(RouteError::SelfDirectMessage));
        assert!(fixture.store.messages().await.is_empty());
    }

    #[tokio::test]
    async fn test_room_not_joined_is_rejected() {
        // テスト項目: 未参加ルームへの送信は RoomNotJoined で拒否される
        // given (前提条件):
        let fixture = create_fixture().await;
        let (alice, _alice_rx, alice_view) = online(&fixture, "alice");

        // when (操作):
        let result = fixture
            .router
            .route(&alice, &alice_view, Target::Room(room("general")), "hi".to_string())
            .await;

        // then (期待する結果):
        assert_eq!(result, Err(RouteError::RoomNotJoined(room("general"))));
        assert!(fixture.store.messages().await.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_content_is_rejected_before_persistence() {
        // テスト項目: 空・長すぎるメッセージは永続化前に拒否される
        // given (前提条件):
        let fixture = create_fixture().await;
        let (alice, _alice_rx, alice_view) = online(&fixture, "alice");
        let bob = Target::Direct(UserId::new("bob".to_string()).unwrap());

        // when (操作):
        let empty = fixture.router.route(&alice, &alice_view, bob.clone(), "   ".to_string()).await;
        let too_long = fixture
            .router
            .route(&alice, &alice_view, bob, "x".repeat(MAX_LEN + 1))
            .await;

        // then (期待する結果):
        assert_eq!(empty, Err(RouteError::EmptyContent));
        assert_eq!(
            too_long,
            Err(RouteError::ContentTooLong {
                max: MAX_LEN,
                actual: MAX_LEN + 1
            })
        );
        assert!(fixture.store.messages().await.is_empty());
    }

    #[tokio::test]
    async fn test_persist_failure_delivers_nothing() {
        // テスト項目: 永続化失敗時は誰にも配信されず PersistFailure が返る
        // given (前提条件):
        let mut store = MockChatStore::new();
        store
            .expect_save_message()
            .returning(|_, _, _| Err(StoreError::Unavailable("disk full".to_string())));
        let registry = Arc::new(ConnectionRegistry::new());
        let router = MessageRouter::new(
            Arc::new(store),
            registry.clone(),
            Arc::new(RoomSubscriptions::new()),
            MAX_LEN,
            Duration::from_secs(1),
        );
        let (alice, mut alice_rx) = Connection::open(identity("alice"));
        let (bob, mut bob_rx) = Connection::open(identity("bob"));
        registry.register(alice.clone());
        registry.register(bob.clone());

        // when (操作):
        let result = router
            .route(&alice, &RoomMembershipView::new(), Target::Direct(bob.identity().user_id.clone()), "hi".to_string())
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(RouteError::PersistFailure(_))));
        assert!(alice_rx.try_recv().is_err());
        assert!(bob_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_persist_timeout_is_persist_failure() {
        // テスト項目: 永続化がタイムアウトした場合も PersistFailure になる
        // given (前提条件):
        let router = MessageRouter::new(
            Arc::new(StalledStore),
            Arc::new(ConnectionRegistry::new()),
            Arc::new(RoomSubscriptions::new()),
            MAX_LEN,
            Duration::from_millis(100),
        );
        let (alice, _alice_rx) = Connection::open(identity("alice"));
        let bob = Target::Direct(UserId::new("bob".to_string()).unwrap());

        // when (操作):
        let result = router
            .route(&alice, &RoomMembershipView::new(), bob, "hi".to_string())
            .await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(RouteError::PersistFailure(StoreError::Timeout.to_string()))
        );
    }

    /// save_message が応答しないストア
    struct StalledStore;

    #[async_trait::async_trait]
    impl ChatStore for StalledStore {
        async fn find_room_membership(
            &self,
            _user_id: &UserId,
        ) -> Result<std::collections::HashSet<RoomKey>, StoreError> {
            unimplemented!()
        }

        async fn is_member(&self, _user_id: &UserId, _room: &RoomKey) -> Result<bool, StoreError> {
            unimplemented!()
        }

        async fn save_message(
            &self,
            _sender: &Identity,
            _target: &Target,
            _content: &MessageContent,
        ) -> Result<CanonicalMessage, StoreError> {
            std::future::pending::<Result<CanonicalMessage, StoreError>>().await
        }

        async fn set_online(&self, _identity: &Identity, _online: bool) -> Result<(), StoreError> {
            unimplemented!()
        }

        async fn list_users(&self) -> Result<Vec<crate::domain::UserPresence>, StoreError> {
            unimplemented!()
        }

        async fn create_room(
            &self,
            _creator: &Identity,
            _key: RoomKey,
            _name: String,
        ) -> Result<crate::domain::Room, StoreError> {
            unimplemented!()
        }

        async fn find_rooms(&self, _user_id: &UserId) -> Result<Vec<crate::domain::Room>, StoreError> {
            unimplemented!()
        }
    }
}
