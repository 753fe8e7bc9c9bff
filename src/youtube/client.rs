use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;

use super::{errors::YouTubeError, types::*};
use crate::config::{http_timeout, AppConfig};

/// YouTubeライブチャット中継APIの操作
///
/// ポーラーはこのトレイト越しにバックエンドへアクセスする（テストでは差し替える）。
#[async_trait]
pub trait LiveChatApi: Send + Sync {
    /// アクセストークンを取得
    async fn fetch_access_token(&self) -> Result<String, YouTubeError>;

    /// 動画IDからライブチャットIDを解決
    async fn resolve_live_chat_id(&self, video_id: &str) -> Result<String, YouTubeError>;

    /// コメントを1ページ取得
    async fn fetch_messages(
        &self,
        live_chat_id: &str,
        page_token: Option<&str>,
    ) -> Result<LiveChatMessagesResponse, YouTubeError>;
}

/// チャットバックエンドのHTTPクライアント
#[derive(Clone)]
pub struct YouTubeChatClient {
    client: Client,
    base_url: String,
    api_token: Option<String>,
}

impl YouTubeChatClient {
    pub fn new(base_url: impl Into<String>, api_token: Option<String>) -> Result<Self, YouTubeError> {
        let client = Client::builder().timeout(http_timeout()).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, YouTubeError> {
        Self::new(config.api_base_url.clone(), config.api_token.clone())
    }

    /// ベースURLにパスセグメントを追加（各セグメントはエンコードされる）
    fn endpoint(&self, segments: &[&str]) -> Result<Url, YouTubeError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| YouTubeError::ParseError(format!("Invalid base URL {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| YouTubeError::ParseError(format!("Base URL cannot have a path: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        query: Option<(&str, &str)>,
    ) -> Result<T, YouTubeError> {
        let mut request = self.client.get(url.clone());
        if let Some(pair) = query {
            request = request.query(&[pair]);
        }
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;

        match response.status() {
            StatusCode::OK => response
                .json::<T>()
                .await
                .map_err(|e| YouTubeError::ParseError(e.to_string())),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                log::warn!("Chat backend rejected request to {}: {}", url.path(), response.status());
                Err(YouTubeError::Unauthorized)
            }
            StatusCode::NOT_FOUND => {
                log::warn!("Chat backend returned 404 for {}", url.path());
                Err(YouTubeError::LiveChatNotFound)
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                log::error!(
                    "Unexpected chat backend response - status: {}, body: {}",
                    status,
                    body
                );
                Err(YouTubeError::UnexpectedStatus(status.as_u16()))
            }
        }
    }
}

#[async_trait]
impl LiveChatApi for YouTubeChatClient {
    async fn fetch_access_token(&self) -> Result<String, YouTubeError> {
        let url = self.endpoint(&["chat", "youtube", "auth"])?;
        let data: AuthResponse = self.get_json(url, None).await?;

        data.access_token
            .filter(|token| !token.is_empty())
            .ok_or(YouTubeError::NoAccessToken)
    }

    async fn resolve_live_chat_id(&self, video_id: &str) -> Result<String, YouTubeError> {
        log::info!("Resolving live chat ID for video: {}", video_id);

        let url = self.endpoint(&["chat", "youtube", video_id, "chatid"])?;
        let data: ChatIdResponse = self.get_json(url, None).await?;

        let chat_id = data
            .live_chat_id
            .filter(|id| !id.is_empty())
            .ok_or(YouTubeError::LiveChatNotFound)?;

        log::info!("Live chat ID retrieved: {}", chat_id);
        Ok(chat_id)
    }

    async fn fetch_messages(
        &self,
        live_chat_id: &str,
        page_token: Option<&str>,
    ) -> Result<LiveChatMessagesResponse, YouTubeError> {
        let url = self.endpoint(&["chat", "youtube", live_chat_id, "messages"])?;
        if let Some(token) = page_token {
            log::debug!("Using page token: {}", token);
        }

        let data: LiveChatMessagesResponse = self
            .get_json(url, page_token.map(|token| ("pageToken", token)))
            .await?;

        log::debug!(
            "Fetched {} chat items (polling interval: {:?}ms)",
            data.items.len(),
            data.polling_interval_millis
        );
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn test_fetch_access_token_sends_bearer() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/chat/youtube/auth")
            .match_header("authorization", "Bearer secret")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"ya29.token"}"#)
            .create_async()
            .await;

        let client =
            YouTubeChatClient::new(format!("{}/api/", server.url()), Some("secret".to_string())).unwrap();
        assert_eq!(client.fetch_access_token().await.unwrap(), "ya29.token");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_null_access_token() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/chat/youtube/auth")
            .with_status(200)
            .with_body(r#"{"access_token":null}"#)
            .create_async()
            .await;

        let client = YouTubeChatClient::new(format!("{}/api", server.url()), None).unwrap();
        assert!(matches!(
            client.fetch_access_token().await,
            Err(YouTubeError::NoAccessToken)
        ));
    }

    #[tokio::test]
    async fn test_resolve_live_chat_id() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/chat/youtube/dQw4w9WgXcQ/chatid")
            .with_status(200)
            .with_body(r#"{"liveChatId":"Cg0KC2RRdzR3OVdnWGNR"}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/api/chat/youtube/missing/chatid")
            .with_status(404)
            .create_async()
            .await;

        let client = YouTubeChatClient::new(format!("{}/api", server.url()), None).unwrap();
        assert_eq!(
            client.resolve_live_chat_id("dQw4w9WgXcQ").await.unwrap(),
            "Cg0KC2RRdzR3OVdnWGNR"
        );
        assert!(matches!(
            client.resolve_live_chat_id("missing").await,
            Err(YouTubeError::LiveChatNotFound)
        ));
    }

    #[tokio::test]
    async fn test_fetch_messages_with_page_token() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/chat/youtube/chat-1/messages")
            .match_query(Matcher::UrlEncoded("pageToken".into(), "next-1".into()))
            .with_status(200)
            .with_body(
                r#"{"items":[{"id":"a"}],"nextPageToken":"next-2","pollingIntervalMillis":3000}"#,
            )
            .create_async()
            .await;

        let client = YouTubeChatClient::new(format!("{}/api", server.url()), None).unwrap();
        let page = client.fetch_messages("chat-1", Some("next-1")).await.unwrap();

        assert_eq!(page.items.len(), 1);
        assert_eq!(page.next_page_token.as_deref(), Some("next-2"));
        assert_eq!(page.polling_interval_millis, Some(3000));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/chat/youtube/chat-1/messages")
            .with_status(403)
            .create_async()
            .await;
        server
            .mock("GET", "/api/chat/youtube/chat-2/messages")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;
        server
            .mock("GET", "/api/chat/youtube/chat-3/messages")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let client = YouTubeChatClient::new(format!("{}/api", server.url()), None).unwrap();
        assert!(matches!(
            client.fetch_messages("chat-1", None).await,
            Err(YouTubeError::Unauthorized)
        ));
        assert!(matches!(
            client.fetch_messages("chat-2", None).await,
            Err(YouTubeError::UnexpectedStatus(500))
        ));
        assert!(matches!(
            client.fetch_messages("chat-3", None).await,
            Err(YouTubeError::ParseError(_))
        ));
    }
}
