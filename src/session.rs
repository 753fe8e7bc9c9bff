// =============================================================================
// チャットセッション
// =============================================================================
// アダプター・バッファ・接続状態・絞り込み条件をまとめて所有するハンドル。
// アダプターからのイベントはディスパッチタスクが1本のチャネルで受け取り、
// バッファへの投入・接続状態の更新・WebSocketへの配信を行う。
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::adapter::{ChatAdapter, ChatEvent, EventSink};
use crate::chat::{
    spawn_flush_task, ChatFilter, ChatMessage, ConnectionSnapshot, ConnectionStatus, MessageBuffer,
    MessageCount, Platform,
};
use crate::config::{flush_interval, AppConfig, MAX_PENDING_MESSAGES, RECONNECT_DELAY_MS};
use crate::notification::{LogNotifier, Notification, NotificationSink};
use crate::placeholder::SimulatedFeed;
use crate::server::types::{ChatErrorPayload, ConnectionUpdatePayload, WsMessage};
use crate::server::ServerState;
use crate::twitch::TwitchAdapter;
use crate::youtube::{LiveChatApi, YouTubeChatPoller};

type Adapters = Vec<Box<dyn ChatAdapter>>;

struct SessionInner {
    config: AppConfig,
    api: Arc<dyn LiveChatApi>,
    server_state: ServerState,
    buffer: MessageBuffer,
    status: ConnectionStatus,
    filter: RwLock<ChatFilter>,
    sink: EventSink,
    adapters: tokio::sync::Mutex<Adapters>,
    rejected: AtomicU64,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

/// チャット集約セッション
#[derive(Clone)]
pub struct ChatSession {
    inner: Arc<SessionInner>,
}

impl ChatSession {
    /// セッションを作成し、ディスパッチタスクとフラッシュタスクを起動
    ///
    /// アダプターへの接続は `initialize` で行う。
    pub fn start(config: AppConfig, api: Arc<dyn LiveChatApi>, server_state: ServerState) -> Self {
        let (sink, events) = EventSink::channel();
        let buffer = MessageBuffer::with_limits(config.max_messages, MAX_PENDING_MESSAGES);

        let session = Self {
            inner: Arc::new(SessionInner {
                config,
                api,
                server_state,
                buffer,
                status: ConnectionStatus::new(),
                filter: RwLock::new(ChatFilter::default()),
                sink,
                adapters: tokio::sync::Mutex::new(Vec::new()),
                rejected: AtomicU64::new(0),
                cancel: CancellationToken::new(),
                tasks: Mutex::new(Vec::new()),
            }),
        };

        let dispatcher = tokio::spawn(session.clone().dispatch(events));

        let server_state = Arc::clone(&session.inner.server_state);
        let flusher = spawn_flush_task(
            session.inner.buffer.clone(),
            flush_interval(),
            session.inner.cancel.clone(),
            move |batch| {
                let state = Arc::clone(&server_state);
                async move {
                    state
                        .read()
                        .await
                        .broadcast(WsMessage::ChatBatch { payload: batch })
                        .await;
                }
            },
        );

        session.lock_tasks().extend([dispatcher, flusher]);
        session
    }

    fn lock_tasks(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.inner.tasks.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn broadcast(&self, message: WsMessage) {
        self.inner.server_state.read().await.broadcast(message).await;
    }

    async fn dispatch(self, mut events: mpsc::UnboundedReceiver<ChatEvent>) {
        loop {
            let event = tokio::select! {
                _ = self.inner.cancel.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };

            match event {
                ChatEvent::Message { message } => self.ingest(message),
                ChatEvent::Connection {
                    platform,
                    connected,
                } => self.set_connection(platform, connected).await,
                ChatEvent::Error {
                    platform,
                    message,
                    retrying,
                } => {
                    log::warn!("{} adapter error (retrying: {}): {}", platform, retrying, message);
                    self.broadcast(WsMessage::ChatError {
                        payload: ChatErrorPayload {
                            platform,
                            message,
                            retrying,
                        },
                    })
                    .await;
                }
                ChatEvent::Rejected { platform, reason } => {
                    log::warn!("Rejected {} message: {}", platform, reason);
                    self.inner.rejected.fetch_add(1, Ordering::Relaxed);
                }
                ChatEvent::Notification { notification } => {
                    LogNotifier.notify(notification.clone());
                    self.broadcast(WsMessage::Notification {
                        payload: notification,
                    })
                    .await;
                }
            }
        }

        log::info!("Event dispatcher ended");
    }

    async fn set_connection(&self, platform: Platform, connected: bool) {
        if self.inner.status.set(platform, connected) {
            log::info!("{} connected: {}", platform, connected);
            self.broadcast(WsMessage::ConnectionUpdate {
                payload: ConnectionUpdatePayload {
                    platform,
                    connected,
                },
            })
            .await;
        }
    }

    /// メッセージを検証して保留キューへ投入
    ///
    /// 検証に失敗したものはバッファに入れず、件数だけ数える。
    pub fn ingest(&self, message: ChatMessage) {
        match message.validate() {
            Ok(message) => self.inner.buffer.enqueue(message),
            Err(e) => {
                log::warn!("Rejected chat message: {}", e);
                self.inner.rejected.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Twitch → YouTube の順に接続
    ///
    /// いずれかが失敗した場合は警告通知を1件出してfalseを返す。
    pub async fn initialize(&self) -> bool {
        let mut adapters = self.inner.adapters.lock().await;
        self.initialize_locked(&mut adapters).await
    }

    async fn initialize_locked(&self, adapters: &mut Adapters) -> bool {
        let twitch_ok = self.connect_twitch(adapters).await;
        let youtube_ok = self.connect_youtube(adapters).await;

        let all_ok = twitch_ok && youtube_ok;
        if !all_ok {
            self.inner.sink.notify(Notification::warning(
                "Chat Initialization",
                "Some chat connections failed",
            ));
        }
        all_ok
    }

    async fn stop_platform(adapters: &mut Adapters, platform: Platform) {
        let mut kept = Vec::with_capacity(adapters.len());
        for mut adapter in adapters.drain(..) {
            if adapter.platform() == platform {
                adapter.stop().await;
            } else {
                kept.push(adapter);
            }
        }
        *adapters = kept;
    }

    async fn connect_twitch(&self, adapters: &mut Adapters) -> bool {
        Self::stop_platform(adapters, Platform::Twitch).await;

        let Some(channel) = self.inner.config.twitch_channel.clone() else {
            log::info!("TWITCH_CHANNEL not set, skipping Twitch chat");
            return true;
        };

        let mut adapter = TwitchAdapter::new(channel, self.inner.sink.clone());
        // 初期化失敗時もアダプター側でプレースホルダーに切り替わる
        let mut result = adapter.initialize().await;
        if result.is_ok() {
            result = adapter.start().await;
        }
        adapters.push(Box::new(adapter));

        match result {
            Ok(()) => true,
            Err(e) => {
                log::error!("Failed to connect to Twitch: {}", e);
                false
            }
        }
    }

    async fn connect_youtube(&self, adapters: &mut Adapters) -> bool {
        Self::stop_platform(adapters, Platform::YouTube).await;

        let mut adapter: Box<dyn ChatAdapter> = match self.inner.config.youtube_video_id.clone() {
            Some(video_id) => Box::new(YouTubeChatPoller::new(
                Arc::clone(&self.inner.api),
                video_id,
                self.inner.sink.clone(),
            )),
            None => {
                log::info!("YOUTUBE_VIDEO_ID not set, using simulated YouTube chat");
                Box::new(SimulatedFeed::youtube(self.inner.sink.clone()))
            }
        };

        let mut result = adapter.initialize().await;
        if result.is_ok() {
            result = adapter.start().await;
        }
        adapters.push(adapter);

        match result {
            Ok(()) => true,
            Err(e) => {
                log::error!("Failed to connect to YouTube: {}", e);
                self.inner.sink.notify(Notification::error(
                    "YouTube Chat Error",
                    "Could not connect to YouTube chat",
                ));
                false
            }
        }
    }

    /// 全アダプターを停止して接続状態をクリア
    pub async fn disconnect(&self) {
        let mut adapters = self.inner.adapters.lock().await;
        self.disconnect_locked(&mut adapters).await;
    }

    async fn disconnect_locked(&self, adapters: &mut Adapters) {
        for mut adapter in adapters.drain(..) {
            adapter.stop().await;
        }
        for platform in Platform::ALL {
            self.set_connection(platform, false).await;
        }
        log::info!("Chat disconnected");
    }

    /// 切断して一定時間待ってから再初期化
    pub async fn reconnect(&self) -> bool {
        let mut adapters = self.inner.adapters.lock().await;
        self.disconnect_locked(&mut adapters).await;
        tokio::time::sleep(Duration::from_millis(RECONNECT_DELAY_MS)).await;
        self.initialize_locked(&mut adapters).await
    }

    /// 表示リストと保留キューを空にする
    pub async fn clear_messages(&self) {
        self.inner.buffer.clear();
        self.broadcast(WsMessage::ChatClear).await;
    }

    /// セッションを終了（アダプター停止後にタスクを止める）
    pub async fn shutdown(&self) {
        self.disconnect().await;
        self.inner.cancel.cancel();

        let tasks: Vec<_> = self.lock_tasks().drain(..).collect();
        for task in tasks {
            let _ = task.await;
        }
        log::info!("Chat session shut down");
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.inner.buffer.messages()
    }

    /// 指定条件で絞り込んだ表示リスト
    pub fn filtered(&self, filter: &ChatFilter) -> Vec<ChatMessage> {
        filter.apply(&self.inner.buffer.messages())
    }

    /// セッションの絞り込み条件で絞り込んだ表示リスト
    pub fn filtered_messages(&self) -> Vec<ChatMessage> {
        let filter = self.filter();
        self.filtered(&filter)
    }

    pub fn filter(&self) -> ChatFilter {
        self.inner
            .filter
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn toggle_platform(&self, platform: Platform) {
        self.inner
            .filter
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .toggle_platform(platform);
    }

    pub fn set_search_query(&self, query: impl Into<String>) {
        self.inner
            .filter
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .query = query.into();
    }

    pub fn connection_status(&self) -> ConnectionSnapshot {
        self.inner.status.snapshot()
    }

    pub fn is_connected(&self) -> bool {
        self.connection_status().is_connected()
    }

    pub fn message_count(&self) -> MessageCount {
        MessageCount::from_messages(&self.inner.buffer.messages())
    }

    pub fn rejected_count(&self) -> u64 {
        self.inner.rejected.load(Ordering::Relaxed)
    }

    pub fn dropped_count(&self) -> u64 {
        self.inner.buffer.dropped_count()
    }

    pub fn buffer(&self) -> &MessageBuffer {
        &self.inner.buffer
    }
}
