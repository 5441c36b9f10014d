//! UseCase: 接続ライフサイクル（Connection Lifecycle Controller）
//!
//! 外部のトランスポートが呼び出す唯一の入口。
//!
//! ```text
//! Connecting --authenticate--> Authenticated --activate--> Active --close--> Closed
//! ```
//!
//! - `authenticate` が失敗した場合、何も登録されない
//! - `activate` はルーム所属の取得 → Registry 登録 → 自動参加 → オンライン化 → presence 配信
//! - `close` は購読解除 → Registry から compare-and-delete → 入力中状態の消去 →
//!   オフライン化 → presence 再配信
//! - 永続ストアのオンラインフラグは identity ごとに直列化して書き込み、書き込む値は
//!   その時点の Registry から決める（再接続と切断が競合しても最後の書き込みが正しい）
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ChatEngine::connect() / Session::handle() / Session::close()
//!
//! ### なぜこのテストが必要か
//! - 認証・ストア障害時に中途半端な登録が残らないことを保証
//! - 同一 ID の再接続で古い接続が置き換えられ、古い接続の切断が新しい接続を消さないことを保証
//! - 全ての拒否が理由コード付きで要求元に届くことを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：接続、参加、送信、入力中、切断
//! - 異常系：認証失敗、認証タイムアウト、ストア障害、非メンバーの参加
//! - エッジケース：再接続による置き換えと古い接続の切断、オフライン化の書き込み中の再接続

use std::{sync::Arc, time::Duration};

use chatrelay_shared::time::Clock;
use dashmap::DashMap;
use tokio::{
    sync::{Mutex, mpsc::UnboundedReceiver},
    task::JoinHandle,
};

use crate::{
    config::EngineConfig,
    domain::{
        AuthError, Authenticator, ChatStore, Connection, Identity, InboundEvent, OnlineSnapshot,
        OutboundEvent, RejectReason, Room, RoomKey, StoreError, Target, UserId, UserPresence,
    },
    infrastructure::{ConnectionRegistry, RoomSubscriptions, TypingTracker},
};

use super::{
    error::{ConnectError, JoinError, RoomError, RouteError, TypingError},
    join_room::{JoinOutcome, JoinRoomUseCase, RoomMembershipView},
    presence::PresenceBroadcaster,
    rooms::RoomDirectory,
    send_message::{Delivery, MessageRouter},
    timeout::store_call,
    typing::TypingUseCase,
};

/// 接続の状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Authenticated,
    Active,
    Closed,
}

impl ConnectionState {
    /// 許可された遷移かどうか
    ///
    /// どの状態からでも Closed へ遷移できる。それ以外は一方向のみ。
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;

        matches!(
            (self, next),
            (Connecting, Authenticated)
                | (Authenticated, Active)
                | (Connecting | Authenticated | Active, Closed)
        )
    }
}

/// 認証済みの ID（まだ Registry には登録されていない）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authenticated {
    identity: Identity,
}

impl Authenticated {
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn into_identity(self) -> Identity {
        self.identity
    }
}

/// 切断処理の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// Registry から削除し、後始末と presence 再配信を行った
    Closed,
    /// 既に新しい接続に置き換えられていた（購読の解除のみ）
    Stale,
}

/// エンジン本体：全ての共有状態とユースケースを束ねる
pub struct ChatEngine {
    config: EngineConfig,
    /// Authenticator（認証の抽象化）
    authenticator: Arc<dyn Authenticator>,
    /// ChatStore（永続ストアの抽象化）
    store: Arc<dyn ChatStore>,
    registry: Arc<ConnectionRegistry>,
    joiner: JoinRoomUseCase,
    router: MessageRouter,
    typing: TypingUseCase,
    presence: PresenceBroadcaster,
    rooms: RoomDirectory,
    /// オンラインフラグの書き込みを identity ごとに直列化するロック
    online_flags: DashMap<UserId, Arc<Mutex<()>>>,
}

impl ChatEngine {
    pub fn new(
        config: EngineConfig,
        authenticator: Arc<dyn Authenticator>,
        store: Arc<dyn ChatStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let subscriptions = Arc::new(RoomSubscriptions::new());
        let tracker = Arc::new(TypingTracker::new(config.typing_ttl, clock));

        Self {
            joiner: JoinRoomUseCase::new(
                Arc::clone(&store),
                Arc::clone(&subscriptions),
                config.store_timeout,
            ),
            router: MessageRouter::new(
                Arc::clone(&store),
                Arc::clone(&registry),
                Arc::clone(&subscriptions),
                config.max_message_length,
                config.store_timeout,
            ),
            typing: TypingUseCase::new(tracker, Arc::clone(&registry), subscriptions),
            presence: PresenceBroadcaster::new(Arc::clone(&registry)),
            rooms: RoomDirectory::new(Arc::clone(&store), config.store_timeout),
            online_flags: DashMap::new(),
            config,
            authenticator,
            store,
            registry,
        }
    }

    /// 認証（Connecting → Authenticated）
    ///
    /// 認証はタイムアウト付きで行い、失敗した場合は何も登録しない。
    pub async fn authenticate(&self, token: &str) -> Result<Authenticated, ConnectError> {
        let result = tokio::time::timeout(
            self.config.auth_timeout,
            self.authenticator.authenticate(token),
        )
        .await;

        match result {
            Ok(Ok(identity)) => {
                tracing::debug!("Authenticated '{}'", identity);
                Ok(Authenticated { identity })
            }
            Ok(Err(AuthError::Unauthenticated(reason))) => {
                tracing::warn!("Authentication rejected: {}", reason);
                Err(ConnectError::Unauthenticated(reason))
            }
            Err(_) => {
                tracing::error!(
                    "Authentication timed out after {:?}",
                    self.config.auth_timeout
                );
                Err(ConnectError::AuthTimeout)
            }
        }
    }

    /// アクティブ化（Authenticated → Active）
    ///
    /// ルーム所属を取得できなかった場合は登録せずにエラーを返す。
    /// 同じ ID の既存接続は置き換えられ、`SessionReplaced` が通知される。
    pub async fn activate(
        self: &Arc<Self>,
        authenticated: Authenticated,
    ) -> Result<(Session, UnboundedReceiver<OutboundEvent>), ConnectError> {
        let identity = authenticated.identity;

        // 1. ルーム所属を取得（このセッション中はこのスナップショットを使う）
        let rooms = store_call(
            self.config.store_timeout,
            self.store.find_room_membership(&identity.user_id),
        )
        .await
        .map_err(|e| {
            tracing::error!("Failed to load room membership of '{}': {}", identity, e);
            ConnectError::MembershipUnavailable(e.to_string())
        })?;

        // 2. Registry に登録（last connection wins）
        let (connection, receiver) = Connection::open(identity);
        if let Some(displaced) = self.registry.register(Arc::clone(&connection)) {
            tracing::info!(
                "'{}' connected again, replacing connection {}",
                connection.identity(),
                displaced.id()
            );
            if displaced.push(OutboundEvent::SessionReplaced).is_err() {
                tracing::debug!("Displaced connection {} was already closed", displaced.id());
            }
        }

        // 3. 所属ルームへ自動参加
        let mut view = RoomMembershipView::new();
        self.joiner.subscribe_all(&connection, &mut view, rooms);

        // 4. 永続ストアのオンラインフラグ（失敗しても接続は続行）
        self.sync_online_flag(connection.identity()).await;

        // 5. presence 配信
        self.presence.identity_connected(connection.identity()).await;

        tracing::info!(
            "Connection {} of '{}' is active with {} room(s)",
            connection.id(),
            connection.identity(),
            view.len()
        );

        let session = Session {
            engine: Arc::clone(self),
            connection,
            view,
            state: ConnectionState::Active,
        };
        Ok((session, receiver))
    }

    /// 認証とアクティブ化をまとめて行う
    pub async fn connect(
        self: &Arc<Self>,
        token: &str,
    ) -> Result<(Session, UnboundedReceiver<OutboundEvent>), ConnectError> {
        let authenticated = self.authenticate(token).await?;
        self.activate(authenticated).await
    }

    /// 現在のオンライン一覧
    pub fn online_snapshot(&self) -> OnlineSnapshot {
        self.presence.current()
    }

    /// 永続ストアに記録されている全ユーザー
    pub async fn list_users(&self) -> Result<Vec<UserPresence>, StoreError> {
        store_call(self.config.store_timeout, self.store.list_users()).await
    }

    /// ルームを作成し、作成者を最初のメンバーにする
    pub async fn create_room(
        &self,
        creator: &Identity,
        key: RoomKey,
        name: String,
    ) -> Result<Room, RoomError> {
        self.rooms.create(creator, key, name).await
    }

    /// ユーザーが所属する全ルーム
    pub async fn rooms_of(&self, user_id: &UserId) -> Result<Vec<Room>, RoomError> {
        self.rooms.rooms_of(user_id).await
    }

    /// 期限切れの入力中状態を消去し、関係者へ通知する
    pub fn sweep_typing(&self) -> usize {
        self.typing.sweep_expired()
    }

    /// 入力中状態の定期 sweep タスクを起動する
    pub fn spawn_typing_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        // tokio::time::interval は 0 を受け付けない
        let period = engine
            .config
            .typing_sweep_interval
            .max(Duration::from_millis(1));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                engine.sweep_typing();
            }
        })
    }

    /// 永続ストアのオンラインフラグを Registry の現在の状態に合わせる
    ///
    /// 同じ identity の書き込みはロックで直列化し、値はロック取得後に Registry から決める。
    /// そのため最後に完了した書き込みは常に最新の登録状態を反映する。
    async fn sync_online_flag(&self, identity: &Identity) {
        let lock = Arc::clone(
            self.online_flags
                .entry(identity.user_id.clone())
                .or_default()
                .value(),
        );
        let _guard = lock.lock().await;

        let online = self.registry.lookup(&identity.user_id).is_some();
        let result =
            store_call(self.config.store_timeout, self.store.set_online(identity, online)).await;
        if let Err(e) = result {
            tracing::warn!(
                "Failed to mark '{}' {} in the store: {}",
                identity,
                if online { "online" } else { "offline" },
                e
            );
        }
    }
}

/// 1 つのアクティブな接続
///
/// 同じ接続のイベントは `&mut self` を通して到着順に処理される。
pub struct Session {
    engine: Arc<ChatEngine>,
    connection: Arc<Connection>,
    view: RoomMembershipView,
    state: ConnectionState,
}

impl Session {
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    pub fn identity(&self) -> &Identity {
        self.connection.identity()
    }

    /// このセッションで参加済みのルーム
    pub fn joined_rooms(&self) -> &RoomMembershipView {
        &self.view
    }

    /// クライアントからのイベントを処理する
    ///
    /// 拒否は全て理由コード付きで要求元に通知される。
    pub async fn handle(&mut self, event: InboundEvent) {
        match event {
            InboundEvent::JoinRoom(room) => {
                let _ = self.join_room(room).await;
            }
            InboundEvent::SendMessage { target, content } => {
                let _ = self.send_message(target, content).await;
            }
            InboundEvent::TypingStart(target) => {
                let _ = self.start_typing(target);
            }
            InboundEvent::TypingStop(target) => {
                let _ = self.stop_typing(target);
            }
        }
    }

    /// ルーム参加（join-accepted / join-rejected を通知）
    pub async fn join_room(&mut self, room: RoomKey) -> Result<JoinOutcome, JoinError> {
        let result = self
            .engine
            .joiner
            .execute(&self.connection, &mut self.view, room.clone())
            .await;
        let event = match &result {
            Ok(_) => OutboundEvent::JoinAccepted(room),
            Err(e) => {
                tracing::warn!("'{}' failed to join: {}", self.identity(), e);
                OutboundEvent::JoinRejected {
                    room: e.room().clone(),
                    reason: e.reason(),
                }
            }
        };
        self.push(event);
        result
    }

    /// メッセージ送信（拒否は operation-rejected を通知）
    pub async fn send_message(
        &mut self,
        target: Target,
        content: String,
    ) -> Result<Delivery, RouteError> {
        let result = self
            .engine
            .router
            .route(&self.connection, &self.view, target, content)
            .await;
        if let Err(e) = &result {
            tracing::warn!("Message from '{}' rejected: {}", self.identity(), e);
            self.reject(e.reason(), e.to_string());
        }
        result
    }

    /// 入力開始
    pub fn start_typing(&mut self, target: Target) -> Result<bool, TypingError> {
        let result = self.engine.typing.start(&self.connection, &self.view, target);
        self.report_typing(result)
    }

    /// 入力終了
    pub fn stop_typing(&mut self, target: Target) -> Result<bool, TypingError> {
        let result = self.engine.typing.stop(&self.connection, &self.view, target);
        self.report_typing(result)
    }

    /// ターゲットで現在入力中のユーザー
    pub fn active_typists(&self, target: &Target) -> Vec<Identity> {
        self.engine
            .typing
            .active_typists(&self.identity().user_id, target)
    }

    /// 要求元に拒否を通知する
    pub fn reject(&self, reason: RejectReason, detail: impl Into<String>) {
        self.push(OutboundEvent::OperationRejected {
            reason,
            detail: detail.into(),
        });
    }

    /// 切断（Active → Closed）
    pub async fn close(mut self) -> CloseOutcome {
        debug_assert!(self.state.can_transition_to(ConnectionState::Closed));
        self.state = ConnectionState::Closed;
        let engine = Arc::clone(&self.engine);
        let identity = self.connection.identity().clone();

        // 1. このセッションの購読を解除
        engine.joiner.leave_all(&self.connection, &self.view);

        // 2. Registry から削除（置き換え済みなら何もしない）
        if !engine
            .registry
            .unregister(&identity.user_id, self.connection.id())
        {
            tracing::info!(
                "Connection {} of '{}' was already replaced",
                self.connection.id(),
                identity
            );
            return CloseOutcome::Stale;
        }

        // 3. 入力中状態を消去し、関係者へ通知
        let cleared = engine.typing.clear_identity(&identity.user_id);
        if cleared > 0 {
            tracing::debug!("Cleared {} typing indicator(s) of '{}'", cleared, identity);
        }

        // 4. 永続ストアのオンラインフラグ（失敗しても続行）
        //    書き込み待ちの間に同じ identity が再接続していればオンラインのまま
        engine.sync_online_flag(&identity).await;

        // 5. presence 再配信
        engine.presence.identity_disconnected(&identity).await;

        CloseOutcome::Closed
    }

    fn report_typing(&self, result: Result<bool, TypingError>) -> Result<bool, TypingError> {
        if let Err(e) = &result {
            tracing::warn!("Typing signal from '{}' rejected: {}", self.identity(), e);
            self.reject(e.reason(), e.to_string());
        }
        result
    }

    fn push(&self, event: OutboundEvent) {
        if let Err(e) = self.connection.push(event) {
            tracing::debug!("Failed to reply to '{}': {}", self.identity(), e);
        }
    }
}
