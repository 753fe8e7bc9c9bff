use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use twitch_irc::login::StaticLoginCredentials;
use twitch_irc::message::ServerMessage;
use twitch_irc::{ClientConfig, SecureTCPTransport, TwitchIRCClient};

use super::errors::TwitchError;
use super::types::TwitchChatEvent;
use crate::adapter::{AdapterError, ChatAdapter, EventSink};
use crate::chat::Platform;
use crate::config::TWITCH_JOIN_TIMEOUT_SECS;
use crate::notification::{Notification, NotificationSink};
use crate::placeholder::{spawn_placeholder_feed, twitch_sequence};

/// チャンネル名を正規化（`#` 除去・小文字化）して検証
pub fn normalize_channel(raw: &str) -> Result<String, TwitchError> {
    let channel = raw.trim().trim_start_matches('#').to_lowercase();
    let valid = !channel.is_empty()
        && channel
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(channel)
    } else {
        Err(TwitchError::InvalidChannel(raw.to_string()))
    }
}

/// Twitch IRC（匿名接続）のプッシュ型アダプター
///
/// 接続に失敗した場合はエラー通知を出し、固定の代替メッセージを流す。
pub struct TwitchAdapter {
    raw_channel: String,
    channel: Option<String>,
    sink: EventSink,
    join_timeout: Duration,
    cancel: Option<CancellationToken>,
    listener: Option<JoinHandle<()>>,
    fallback: Option<JoinHandle<()>>,
}

impl TwitchAdapter {
    pub fn new(channel: impl Into<String>, sink: EventSink) -> Self {
        Self {
            raw_channel: channel.into(),
            channel: None,
            sink,
            join_timeout: Duration::from_secs(TWITCH_JOIN_TIMEOUT_SECS),
            cancel: None,
            listener: None,
            fallback: None,
        }
    }

    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    /// 検証済みのチャンネル名
    pub fn channel(&self) -> Option<&str> {
        self.channel.as_deref()
    }

    /// 代替メッセージを流しているか
    pub fn is_fallback_active(&self) -> bool {
        self.fallback.as_ref().is_some_and(|task| !task.is_finished())
    }

    async fn connect(&mut self, channel: String, cancel: CancellationToken) -> Result<(), TwitchError> {
        let (mut incoming, client) =
            TwitchIRCClient::<SecureTCPTransport, StaticLoginCredentials>::new(ClientConfig::default());
        let (joined_tx, joined_rx) = oneshot::channel::<()>();

        let sink = self.sink.clone();
        let client_handle = client.clone();
        let listener_channel = channel.clone();

        self.listener = Some(tokio::spawn(async move {
            // クライアントを保持しておかないと接続が閉じる
            let _keep_alive = client_handle;
            let mut joined_tx = Some(joined_tx);

            loop {
                let message = tokio::select! {
                    _ = cancel.cancelled() => break,
                    message = incoming.recv() => message,
                };

                match message {
                    Some(ServerMessage::Join(msg)) => {
                        log::info!("Joined Twitch channel #{}", msg.channel_login);
                        if let Some(tx) = joined_tx.take() {
                            let _ = tx.send(());
                        }
                        sink.connection(Platform::Twitch, true);
                        sink.notify(Notification::success(
                            "Twitch Chat Connected",
                            "Now reading Twitch chat messages",
                        ));
                    }
                    Some(ServerMessage::Privmsg(msg)) => {
                        // 匿名接続なので自分の発言は届かない
                        let event = TwitchChatEvent::from_privmsg(&msg, None);
                        if event.is_self {
                            continue;
                        }
                        match event.normalize() {
                            Ok(message) => sink.message(message),
                            Err(e) => sink.rejected(Platform::Twitch, e.to_string()),
                        }
                    }
                    Some(ServerMessage::Reconnect(_)) => {
                        log::warn!("Twitch requested reconnect for #{}", listener_channel);
                        sink.connection(Platform::Twitch, false);
                        sink.notify(Notification::warning(
                            "Twitch Chat Disconnected",
                            "Lost connection to Twitch chat",
                        ));
                    }
                    Some(_) => {}
                    None => {
                        log::warn!("Twitch connection closed for #{}", listener_channel);
                        sink.connection(Platform::Twitch, false);
                        sink.notify(Notification::warning(
                            "Twitch Chat Disconnected",
                            "Lost connection to Twitch chat",
                        ));
                        break;
                    }
                }
            }

            log::debug!("Twitch listener for #{} stopped", listener_channel);
        }));

        client
            .join(channel.clone())
            .map_err(|e| TwitchError::JoinFailed(e.to_string()))?;

        match tokio::time::timeout(self.join_timeout, joined_rx).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(TwitchError::JoinFailed(
                "connection closed before join".to_string(),
            )),
            Err(_) => Err(TwitchError::JoinTimeout),
        }
    }

    fn start_fallback(&mut self) {
        let cancel = CancellationToken::new();
        self.fallback = Some(spawn_placeholder_feed(
            Platform::Twitch,
            twitch_sequence(),
            self.sink.clone(),
            cancel.clone(),
        ));
        self.cancel = Some(cancel);
    }

    /// 接続失敗を通知してプレースホルダー表示に切り替える
    fn fail_over(&mut self, e: &TwitchError) {
        self.sink.error(Platform::Twitch, e.to_string(), false);
        self.sink.notify(Notification::error(
            "Twitch Chat Error",
            "Could not connect to Twitch chat",
        ));
        self.start_fallback();
    }
}

#[async_trait]
impl ChatAdapter for TwitchAdapter {
    fn platform(&self) -> Platform {
        Platform::Twitch
    }

    async fn initialize(&mut self) -> Result<(), AdapterError> {
        match normalize_channel(&self.raw_channel) {
            Ok(channel) => {
                self.channel = Some(channel);
                Ok(())
            }
            Err(e) => {
                log::error!("Invalid Twitch channel: {}", e);
                self.fail_over(&e);
                Err(e.into())
            }
        }
    }

    async fn start(&mut self) -> Result<(), AdapterError> {
        let channel = self.channel.clone().ok_or(TwitchError::NotInitialized)?;
        if self.is_running() {
            return Ok(());
        }

        log::info!("Connecting to Twitch channel #{}", channel);
        let cancel = CancellationToken::new();
        self.cancel = Some(cancel.clone());

        match self.connect(channel, cancel.clone()).await {
            Ok(()) => Ok(()),
            Err(e) => {
                log::error!("Failed to connect to Twitch: {}", e);
                cancel.cancel();
                if let Some(listener) = self.listener.take() {
                    let _ = listener.await;
                }

                self.fail_over(&e);
                Err(e.into())
            }
        }
    }

    async fn stop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        if let Some(listener) = self.listener.take() {
            let _ = listener.await;
        }
        if let Some(fallback) = self.fallback.take() {
            let _ = fallback.await;
        }
        self.sink.connection(Platform::Twitch, false);
    }

    fn is_running(&self) -> bool {
        self.listener.as_ref().is_some_and(|task| !task.is_finished())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::ChatEvent;

    #[test]
    fn test_normalize_channel() {
        assert_eq!(normalize_channel("#SomeChannel").unwrap(), "somechannel");
        assert_eq!(normalize_channel("  user_01 ").unwrap(), "user_01");
        assert!(normalize_channel("").is_err());
        assert!(normalize_channel("#").is_err());
        assert!(normalize_channel("bad channel").is_err());
    }

    #[tokio::test]
    async fn test_invalid_channel_falls_back_to_placeholder() {
        let (sink, mut rx) = EventSink::channel();
        let mut adapter = TwitchAdapter::new("not a channel!", sink);

        let result = adapter.initialize().await;
        assert!(matches!(
            result,
            Err(AdapterError::Twitch(TwitchError::InvalidChannel(_)))
        ));
        assert!(matches!(
            rx.recv().await,
            Some(ChatEvent::Error { platform: Platform::Twitch, retrying: false, .. })
        ));
        match rx.recv().await {
            Some(ChatEvent::Notification { notification }) => {
                assert_eq!(notification.title, "Twitch Chat Error");
            }
            other => panic!("unexpected event: {:?}", other),
        }

        // 接続失敗時と同じくプレースホルダーが流れる
        assert!(adapter.is_fallback_active());
        assert!(matches!(rx.recv().await, Some(ChatEvent::Message { .. })));

        adapter.stop().await;
        assert!(!adapter.is_fallback_active());
    }

    #[tokio::test]
    async fn test_start_requires_initialize() {
        let (sink, _rx) = EventSink::channel();
        let mut adapter = TwitchAdapter::new("somechannel", sink);

        let result = adapter.start().await;
        assert!(matches!(
            result,
            Err(AdapterError::Twitch(TwitchError::NotInitialized))
        ));
        assert!(!adapter.is_running());
    }

    #[tokio::test]
    async fn test_fallback_feed_stops_with_adapter() {
        let (sink, mut rx) = EventSink::channel();
        let mut adapter = TwitchAdapter::new("somechannel", sink);
        adapter.initialize().await.unwrap();
        assert_eq!(adapter.channel(), Some("somechannel"));

        adapter.start_fallback();
        assert!(adapter.is_fallback_active());
        assert!(!adapter.is_running());

        // 遅延0の1件目はすぐに届く
        assert!(matches!(rx.recv().await, Some(ChatEvent::Message { .. })));

        adapter.stop().await;
        assert!(!adapter.is_fallback_active());
        assert!(matches!(
            rx.recv().await,
            Some(ChatEvent::Connection { platform: Platform::Twitch, connected: false })
        ));
    }
}
