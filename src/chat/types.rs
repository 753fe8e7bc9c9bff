use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// チャットの取得元プラットフォーム
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Twitch,
    YouTube,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Twitch, Platform::YouTube];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Twitch => "twitch",
            Platform::YouTube => "youtube",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "twitch" => Ok(Platform::Twitch),
            "youtube" => Ok(Platform::YouTube),
            other => Err(format!("unknown platform: {}", other)),
        }
    }
}

/// エモートの出現位置
///
/// `positions` の各要素は元メッセージ上の `[start, end]`（両端を含む文字インデックス）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotePlacement {
    pub id: String,
    pub name: String,
    pub url: String,
    pub positions: Vec<[usize; 2]>,
}

/// 全プラットフォーム共通のチャットメッセージ
///
/// 生成後は変更しない。`message` はサニタイズ前の生テキストで、
/// `emotes` のオフセットは常にこの生テキストを基準とする。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub platform: Platform,
    pub username: String,
    pub message: String,
    /// エポックからのミリ秒
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub badges: BTreeSet<String>,
    #[serde(default)]
    pub emotes: Vec<EmotePlacement>,
}

/// 受信メッセージの検証エラー
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidMessage {
    #[error("Message id is empty")]
    MissingId,

    #[error("Username is empty")]
    MissingUsername,

    #[error("Message body is empty")]
    MissingMessage,

    #[error("Timestamp is not positive: {0}")]
    InvalidTimestamp(i64),

    #[error("Malformed payload: {0}")]
    Malformed(String),
}

impl From<InvalidMessage> for String {
    fn from(err: InvalidMessage) -> String {
        err.to_string()
    }
}

impl ChatMessage {
    /// 必須フィールドを検証し、妥当なメッセージのみを返す
    pub fn validate(self) -> Result<Self, InvalidMessage> {
        if self.id.trim().is_empty() {
            return Err(InvalidMessage::MissingId);
        }
        if self.username.trim().is_empty() {
            return Err(InvalidMessage::MissingUsername);
        }
        if self.message.is_empty() {
            return Err(InvalidMessage::MissingMessage);
        }
        if self.timestamp <= 0 {
            return Err(InvalidMessage::InvalidTimestamp(self.timestamp));
        }
        Ok(self)
    }
}

/// 現在時刻（エポックミリ秒）
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
