//! テスト用の中継APIスタブ

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::client::LiveChatApi;
use super::errors::YouTubeError;
use super::types::LiveChatMessagesResponse;

/// 取得結果を順番に返すスタブ（尽きたら空ページ）
pub struct FakeLiveChatApi {
    pub access_token: Option<String>,
    pub live_chat_id: Option<String>,
    pub fetch_delay: Duration,
    pages: Mutex<VecDeque<Result<LiveChatMessagesResponse, YouTubeError>>>,
    page_tokens: Mutex<Vec<Option<String>>>,
    fetch_calls: AtomicUsize,
}

impl FakeLiveChatApi {
    pub fn new() -> Self {
        Self {
            access_token: Some("token".to_string()),
            live_chat_id: Some("chat-1".to_string()),
            fetch_delay: Duration::ZERO,
            pages: Mutex::new(VecDeque::new()),
            page_tokens: Mutex::new(Vec::new()),
            fetch_calls: AtomicUsize::new(0),
        }
    }

    pub fn push_page(&self, page: Result<LiveChatMessagesResponse, YouTubeError>) {
        self.pages.lock().unwrap().push_back(page);
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// 各取得で渡されたページトークン
    pub fn page_tokens(&self) -> Vec<Option<String>> {
        self.page_tokens.lock().unwrap().clone()
    }
}

/// 1件のコメントを含むページ
pub fn page_with_item(id: &str, next_page_token: Option<&str>, interval: Option<u64>) -> LiveChatMessagesResponse {
    LiveChatMessagesResponse {
        items: vec![serde_json::json!({
            "id": id,
            "snippet": {
                "displayMessage": format!("message {}", id),
                "publishedAt": "2024-01-15T12:34:56Z"
            },
            "authorDetails": { "displayName": "YouTubeFan" }
        })],
        next_page_token: next_page_token.map(str::to_string),
        polling_interval_millis: interval,
    }
}

#[async_trait]
impl LiveChatApi for FakeLiveChatApi {
    async fn fetch_access_token(&self) -> Result<String, YouTubeError> {
        self.access_token.clone().ok_or(YouTubeError::NoAccessToken)
    }

    async fn resolve_live_chat_id(&self, _video_id: &str) -> Result<String, YouTubeError> {
        self.live_chat_id.clone().ok_or(YouTubeError::LiveChatNotFound)
    }

    async fn fetch_messages(
        &self,
        _live_chat_id: &str,
        page_token: Option<&str>,
    ) -> Result<LiveChatMessagesResponse, YouTubeError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.page_tokens
            .lock()
            .unwrap()
            .push(page_token.map(str::to_string));

        if !self.fetch_delay.is_zero() {
            tokio::time::sleep(self.fetch_delay).await;
        }

        let next = self.pages.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(LiveChatMessagesResponse::default()))
    }
}
