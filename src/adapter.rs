//! チャット取得元アダプターの共通インターフェース
//!
//! 各アダプターは取得元固有のイベントを共通の `ChatMessage` に正規化し、
//! `EventSink` を通してセッションへ送る。送信はブロックしない。

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::chat::{ChatMessage, Platform};
use crate::notification::{Notification, NotificationSink};
use crate::twitch::TwitchError;
use crate::youtube::errors::YouTubeError;

/// アダプターからセッションへ送るイベント
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ChatEvent {
    /// 正規化済みメッセージ
    Message { message: ChatMessage },

    /// 接続状態の変化
    Connection { platform: Platform, connected: bool },

    /// エラー（`retrying` がtrueなら自動で再試行する）
    Error {
        platform: Platform,
        message: String,
        retrying: bool,
    },

    /// 検証に失敗して破棄したメッセージ
    Rejected { platform: Platform, reason: String },

    /// ユーザー向け通知
    Notification { notification: Notification },
}

/// アダプター共通のエラー
#[derive(Error, Debug)]
pub enum AdapterError {
    #[error(transparent)]
    YouTube(#[from] YouTubeError),

    #[error(transparent)]
    Twitch(#[from] TwitchError),
}

impl From<AdapterError> for String {
    fn from(err: AdapterError) -> String {
        err.to_string()
    }
}

/// イベント送信ハンドル（クローンして各アダプターに渡す）
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<ChatEvent>,
}

impl EventSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ChatEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn send(&self, event: ChatEvent) {
        if self.tx.send(event).is_err() {
            log::debug!("Event receiver dropped, discarding event");
        }
    }

    pub fn message(&self, message: ChatMessage) {
        self.send(ChatEvent::Message { message });
    }

    pub fn connection(&self, platform: Platform, connected: bool) {
        self.send(ChatEvent::Connection {
            platform,
            connected,
        });
    }

    pub fn error(&self, platform: Platform, message: impl Into<String>, retrying: bool) {
        self.send(ChatEvent::Error {
            platform,
            message: message.into(),
            retrying,
        });
    }

    pub fn rejected(&self, platform: Platform, reason: impl Into<String>) {
        self.send(ChatEvent::Rejected {
            platform,
            reason: reason.into(),
        });
    }
}

impl NotificationSink for EventSink {
    fn notify(&self, notification: Notification) {
        self.send(ChatEvent::Notification { notification });
    }
}

/// チャット取得元アダプター
#[async_trait]
pub trait ChatAdapter: Send + Sync {
    fn platform(&self) -> Platform;

    /// 接続前の準備（認証・セッション解決など）
    async fn initialize(&mut self) -> Result<(), AdapterError>;

    /// 受信を開始
    async fn start(&mut self) -> Result<(), AdapterError>;

    /// 受信を停止（実行中の通信は待たない）
    async fn stop(&mut self);

    fn is_running(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sink_delivers_events_in_order() {
        let (sink, mut rx) = EventSink::channel();
        sink.connection(Platform::Twitch, true);
        sink.error(Platform::YouTube, "boom", true);
        sink.notify(Notification::info("title", "body"));

        assert!(matches!(
            rx.recv().await,
            Some(ChatEvent::Connection { platform: Platform::Twitch, connected: true })
        ));
        assert!(matches!(
            rx.recv().await,
            Some(ChatEvent::Error { retrying: true, .. })
        ));
        assert!(matches!(rx.recv().await, Some(ChatEvent::Notification { .. })));
    }

    #[test]
    fn test_send_after_receiver_dropped_is_ignored() {
        let (sink, rx) = EventSink::channel();
        drop(rx);
        sink.connection(Platform::Twitch, false);
    }
}
