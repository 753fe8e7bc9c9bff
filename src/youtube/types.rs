use chrono::DateTime;
use serde::Deserialize;
use std::collections::BTreeSet;

use crate::chat::{ChatMessage, InvalidMessage, Platform};

/// YouTubeコメントの表示色
pub const YOUTUBE_COLOR: &str = "#ff0000";

// チャットバックエンドのレスポンス型

#[derive(Debug, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatIdResponse {
    #[serde(rename = "liveChatId")]
    pub live_chat_id: Option<String>,
}

/// 1ページ分のコメント
///
/// 各要素は検証前の生JSONのまま保持し、1件ずつ `parse_item` で変換する。
#[derive(Debug, Default, Deserialize)]
pub struct LiveChatMessagesResponse {
    #[serde(default)]
    pub items: Vec<serde_json::Value>,
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
    #[serde(rename = "pollingIntervalMillis")]
    pub polling_interval_millis: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct LiveChatMessageItem {
    pub id: Option<String>,
    pub snippet: MessageSnippet,
    #[serde(rename = "authorDetails")]
    pub author_details: AuthorDetails,
}

#[derive(Debug, Deserialize)]
pub struct MessageSnippet {
    #[serde(rename = "publishedAt")]
    pub published_at: Option<String>,
    #[serde(rename = "displayMessage")]
    pub display_message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AuthorDetails {
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
    #[serde(rename = "isChatOwner", default)]
    pub is_chat_owner: bool,
    #[serde(rename = "isChatModerator", default)]
    pub is_chat_moderator: bool,
    #[serde(rename = "isChatSponsor", default)]
    pub is_chat_sponsor: bool,
}

/// 投稿者の属性からバッジを生成（それぞれ独立に付与）
pub fn extract_badges(author: &AuthorDetails) -> BTreeSet<String> {
    let mut badges = BTreeSet::new();
    if author.is_chat_owner {
        badges.insert("owner".to_string());
    }
    if author.is_chat_moderator {
        badges.insert("moderator".to_string());
    }
    if author.is_chat_sponsor {
        badges.insert("member".to_string());
    }
    badges
}

/// 生のコメントJSONを共通メッセージに変換して検証
pub fn parse_item(value: serde_json::Value) -> Result<ChatMessage, InvalidMessage> {
    let item: LiveChatMessageItem =
        serde_json::from_value(value).map_err(|e| InvalidMessage::Malformed(e.to_string()))?;

    let id = item
        .id
        .filter(|id| !id.is_empty())
        .ok_or(InvalidMessage::MissingId)?;

    let published_at = item
        .snippet
        .published_at
        .as_deref()
        .ok_or_else(|| InvalidMessage::Malformed("missing publishedAt".to_string()))?;
    let timestamp = DateTime::parse_from_rfc3339(published_at)
        .map_err(|e| InvalidMessage::Malformed(format!("publishedAt {:?}: {}", published_at, e)))?
        .timestamp_millis();

    ChatMessage {
        id: format!("youtube-{}", id),
        platform: Platform::YouTube,
        username: item.author_details.display_name.clone().unwrap_or_default(),
        message: item.snippet.display_message.unwrap_or_default(),
        timestamp,
        color: Some(YOUTUBE_COLOR.to_string()),
        badges: extract_badges(&item.author_details),
        emotes: vec![],
    }
    .validate()
}
