use async_trait::async_trait;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{client::LiveChatApi, errors::YouTubeError, state::PollingState, types::parse_item};
use crate::adapter::{AdapterError, ChatAdapter, EventSink};
use crate::chat::Platform;
use crate::config::ERROR_RETRY_DELAY_MS;

/// ポーラーの状態
///
/// `Idle → Initializing → Ready → Polling → Stopping → Idle`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PollerPhase {
    Idle,
    Initializing,
    Ready,
    Polling,
    Stopping,
}

type SharedState = Arc<Mutex<Option<PollingState>>>;

fn lock_state(state: &SharedState) -> MutexGuard<'_, Option<PollingState>> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// YouTubeコメントのプル型アダプター
///
/// 取得完了後に次回の取得を予約するため、同時に実行される取得は常に1件以下。
/// 停止しても実行中の取得は中断せず、完了後に結果を破棄する。
pub struct YouTubeChatPoller {
    api: Arc<dyn LiveChatApi>,
    video_id: String,
    sink: EventSink,
    phase: PollerPhase,
    state: SharedState,
    cancel: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
}

impl YouTubeChatPoller {
    pub fn new(api: Arc<dyn LiveChatApi>, video_id: impl Into<String>, sink: EventSink) -> Self {
        Self {
            api,
            video_id: video_id.into(),
            sink,
            phase: PollerPhase::Idle,
            state: Arc::new(Mutex::new(None)),
            cancel: None,
            task: None,
        }
    }

    pub fn phase(&self) -> PollerPhase {
        self.phase
    }

    async fn resolve(&self) -> Result<String, YouTubeError> {
        self.api.fetch_access_token().await?;
        self.api.resolve_live_chat_id(&self.video_id).await
    }

    /// ポーリングループ（内部実装）
    async fn polling_loop(
        api: Arc<dyn LiveChatApi>,
        state: SharedState,
        sink: EventSink,
        cancel: CancellationToken,
    ) {
        loop {
            let (live_chat_id, page_token) = match lock_state(&state).as_ref() {
                Some(s) => (s.live_chat_id.clone(), s.next_page_token.clone()),
                None => {
                    log::warn!("Polling state is None, stopping poller");
                    break;
                }
            };

            // 実行中の取得は中断しない
            let result = api.fetch_messages(&live_chat_id, page_token.as_deref()).await;

            if cancel.is_cancelled() {
                log::debug!("Poller stopped during fetch, discarding result");
                break;
            }

            let delay = match result {
                Ok(page) => {
                    for item in page.items {
                        match parse_item(item) {
                            Ok(message) => sink.message(message),
                            Err(e) => sink.rejected(Platform::YouTube, e.to_string()),
                        }
                    }

                    let mut guard = lock_state(&state);
                    match guard.as_mut() {
                        Some(s) => {
                            s.update(page.next_page_token, page.polling_interval_millis);
                            s.polling_interval()
                        }
                        None => break,
                    }
                }
                Err(e) => {
                    log::error!("Polling error, retrying in {}ms: {}", ERROR_RETRY_DELAY_MS, e);
                    sink.error(Platform::YouTube, e.to_string(), true);
                    Duration::from_millis(ERROR_RETRY_DELAY_MS)
                }
            };

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        log::info!("Polling loop ended");
    }
}

#[async_trait]
impl ChatAdapter for YouTubeChatPoller {
    fn platform(&self) -> Platform {
        Platform::YouTube
    }

    async fn initialize(&mut self) -> Result<(), AdapterError> {
        if self.phase == PollerPhase::Polling {
            return Err(YouTubeError::PollerAlreadyRunning.into());
        }

        self.phase = PollerPhase::Initializing;
        log::info!("Initializing YouTube chat for video: {}", self.video_id);

        match self.resolve().await {
            Ok(live_chat_id) => {
                *lock_state(&self.state) = Some(PollingState::new(live_chat_id));
                self.phase = PollerPhase::Ready;
                Ok(())
            }
            Err(e) => {
                // 再初期化されるまで使用不可（再試行しない）
                log::error!("YouTube chat initialization failed: {}", e);
                *lock_state(&self.state) = None;
                self.phase = PollerPhase::Idle;
                self.sink.error(Platform::YouTube, e.to_string(), false);
                Err(e.into())
            }
        }
    }

    async fn start(&mut self) -> Result<(), AdapterError> {
        match self.phase {
            PollerPhase::Ready => {}
            PollerPhase::Polling => return Err(YouTubeError::PollerAlreadyRunning.into()),
            _ => return Err(YouTubeError::NotInitialized.into()),
        }

        let cancel = CancellationToken::new();
        self.task = Some(tokio::spawn(Self::polling_loop(
            Arc::clone(&self.api),
            Arc::clone(&self.state),
            self.sink.clone(),
            cancel.clone(),
        )));
        self.cancel = Some(cancel);
        self.phase = PollerPhase::Polling;

        if let Some(s) = lock_state(&self.state).as_ref() {
            log::info!("Polling started for live chat: {}", s.live_chat_id);
        }
        self.sink.connection(Platform::YouTube, true);
        Ok(())
    }

    async fn stop(&mut self) {
        self.phase = PollerPhase::Stopping;
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        // 実行中の取得は待たずに切り離す
        self.task.take();
        *lock_state(&self.state) = None;
        self.phase = PollerPhase::Idle;
        self.sink.connection(Platform::YouTube, false);
    }

    fn is_running(&self) -> bool {
        self.phase == PollerPhase::Polling
    }
}
