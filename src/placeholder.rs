//! 接続できない場合の代替メッセージ
//!
//! 固定のメッセージ列を一定の時間差で流す。Twitch接続失敗時のフォールバックと、
//! YouTubeが未設定の場合のシミュレーション表示に使う。

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::adapter::{AdapterError, ChatAdapter, EventSink};
use crate::chat::types::now_millis;
use crate::chat::{ChatMessage, Platform};
use crate::notification::{Notification, NotificationSink};

/// 代替メッセージ1件分の定義
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderMessage {
    pub username: &'static str,
    pub message: &'static str,
    pub color: &'static str,
    pub badge: Option<&'static str>,
    /// 開始からの遅延
    pub delay: Duration,
}

/// Twitch接続失敗時のメッセージ列（2秒間隔）
pub fn twitch_sequence() -> Vec<PlaceholderMessage> {
    let entries = [
        ("StreamerFan1", "Great stream! Kappa", "#ff6b6b"),
        ("ChatMod", "Welcome everyone!", "#4ecdc4"),
        ("Viewer123", "How are you doing today?", "#45b7d1"),
        ("EmoteUser", "PogChamp amazing content!", "#96ceb4"),
    ];

    entries
        .iter()
        .enumerate()
        .map(|(index, &(username, message, color))| PlaceholderMessage {
            username,
            message,
            color,
            badge: (index == 1).then_some("moderator"),
            delay: Duration::from_millis(index as u64 * 2000),
        })
        .collect()
}

/// YouTubeシミュレーション用のメッセージ列（6秒後から3秒間隔）
pub fn youtube_sequence() -> Vec<PlaceholderMessage> {
    let entries = [
        ("YouTubeFan", "Love this content!", "#ff0000"),
        ("Subscriber", "Been watching for years!", "#00ff00"),
        ("NewViewer", "First time here, loving it!", "#0000ff"),
    ];

    entries
        .iter()
        .enumerate()
        .map(|(index, &(username, message, color))| PlaceholderMessage {
            username,
            message,
            color,
            badge: (index == 1).then_some("member"),
            delay: Duration::from_millis((index as u64 + 2) * 3000),
        })
        .collect()
}

fn to_chat_message(platform: Platform, index: usize, entry: &PlaceholderMessage) -> ChatMessage {
    let now = now_millis();
    ChatMessage {
        id: format!("mock-{}-{}-{}", platform, now, index),
        platform,
        username: entry.username.to_string(),
        message: entry.message.to_string(),
        timestamp: now,
        color: Some(entry.color.to_string()),
        badges: entry.badge.map(str::to_string).into_iter().collect::<BTreeSet<_>>(),
        emotes: vec![],
    }
}

/// メッセージ列を時間差で送るタスクを起動
pub fn spawn_placeholder_feed(
    platform: Platform,
    sequence: Vec<PlaceholderMessage>,
    sink: EventSink,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let started = tokio::time::Instant::now();
        let mut ordered: Vec<(usize, PlaceholderMessage)> = sequence.into_iter().enumerate().collect();
        ordered.sort_by_key(|(_, entry)| entry.delay);

        for (index, entry) in ordered {
            tokio::select! {
                _ = cancel.cancelled() => {
                    log::debug!("Placeholder feed for {} cancelled", platform);
                    return;
                }
                _ = tokio::time::sleep_until(started + entry.delay) => {
                    sink.message(to_chat_message(platform, index, &entry));
                }
            }
        }
    })
}

/// 固定メッセージ列を流すだけのアダプター
pub struct SimulatedFeed {
    platform: Platform,
    sequence: Vec<PlaceholderMessage>,
    sink: EventSink,
    cancel: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
}

impl SimulatedFeed {
    pub fn new(platform: Platform, sequence: Vec<PlaceholderMessage>, sink: EventSink) -> Self {
        Self {
            platform,
            sequence,
            sink,
            cancel: None,
            task: None,
        }
    }

    /// YouTube未設定時のシミュレーション
    pub fn youtube(sink: EventSink) -> Self {
        Self::new(Platform::YouTube, youtube_sequence(), sink)
    }
}

#[async_trait]
impl ChatAdapter for SimulatedFeed {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn initialize(&mut self) -> Result<(), AdapterError> {
        Ok(())
    }

    async fn start(&mut self) -> Result<(), AdapterError> {
        if self.is_running() {
            return Ok(());
        }

        let cancel = CancellationToken::new();
        self.task = Some(spawn_placeholder_feed(
            self.platform,
            self.sequence.clone(),
            self.sink.clone(),
            cancel.clone(),
        ));
        self.cancel = Some(cancel);

        self.sink.connection(self.platform, true);
        if self.platform == Platform::YouTube {
            self.sink.notify(Notification::info(
                "YouTube Chat Mock",
                "YouTube chat simulation active",
            ));
        }

        log::info!("Simulated {} feed started", self.platform);
        Ok(())
    }

    async fn stop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        self.sink.connection(self.platform, false);
    }

    fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}
