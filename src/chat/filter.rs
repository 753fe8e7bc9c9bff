use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::types::{ChatMessage, Platform};

/// 表示リストに対するプラットフォーム・キーワード絞り込み条件
///
/// 読み出しのたびに表示リストから導出する（結果はキャッシュしない）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatFilter {
    /// 選択中のプラットフォーム（空なら絞り込みなし）
    pub platforms: BTreeSet<Platform>,
    /// 検索語（前後の空白は無視）
    pub query: String,
}

impl Default for ChatFilter {
    fn default() -> Self {
        Self {
            platforms: Platform::ALL.into_iter().collect(),
            query: String::new(),
        }
    }
}

impl ChatFilter {
    pub fn new(platforms: impl IntoIterator<Item = Platform>, query: impl Into<String>) -> Self {
        Self {
            platforms: platforms.into_iter().collect(),
            query: query.into(),
        }
    }

    /// 選択中なら外し、未選択なら加える
    pub fn toggle_platform(&mut self, platform: Platform) {
        if !self.platforms.remove(&platform) {
            self.platforms.insert(platform);
        }
    }

    pub fn is_selected(&self, platform: Platform) -> bool {
        self.platforms.contains(&platform)
    }

    /// 条件に一致するメッセージを元の順序のまま返す
    pub fn apply(&self, messages: &[ChatMessage]) -> Vec<ChatMessage> {
        let query = self.query.trim().to_lowercase();

        messages
            .iter()
            .filter(|msg| self.platforms.is_empty() || self.is_selected(msg.platform))
            .filter(|msg| {
                query.is_empty()
                    || msg.username.to_lowercase().contains(&query)
                    || msg.message.to_lowercase().contains(&query)
            })
            .cloned()
            .collect()
    }
}

/// プラットフォーム別のメッセージ件数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageCount {
    pub total: usize,
    pub twitch: usize,
    pub youtube: usize,
}

impl MessageCount {
    pub fn from_messages(messages: &[ChatMessage]) -> Self {
        messages.iter().fold(
            Self {
                total: messages.len(),
                ..Self::default()
            },
            |mut count, msg| {
                match msg.platform {
                    Platform::Twitch => count.twitch += 1,
                    Platform::YouTube => count.youtube += 1,
                }
                count
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(id: &str, platform: Platform, username: &str, text: &str) -> ChatMessage {
        ChatMessage {
            id: id.to_string(),
            platform,
            username: username.to_string(),
            message: text.to_string(),
            timestamp: 1_700_000_000_000,
            color: None,
            badges: BTreeSet::new(),
            emotes: vec![],
        }
    }

    fn fixture() -> Vec<ChatMessage> {
        vec![
            message("1", Platform::Twitch, "StreamerFan1", "Great stream! Kappa"),
            message("2", Platform::YouTube, "YouTubeFan", "kappa on youtube?"),
            message("3", Platform::Twitch, "KappaKing", "hello"),
            message("4", Platform::Twitch, "Viewer123", "How are you doing today?"),
            message("5", Platform::YouTube, "Subscriber", "Been watching for years!"),
        ]
    }

    fn ids(messages: &[ChatMessage]) -> Vec<&str> {
        messages.iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn test_default_selects_all_platforms() {
        let filter = ChatFilter::default();
        assert_eq!(filter.apply(&fixture()).len(), 5);
    }

    #[test]
    fn test_platform_filter() {
        let filter = ChatFilter::new([Platform::YouTube], "");
        assert_eq!(ids(&filter.apply(&fixture())), vec!["2", "5"]);
    }

    #[test]
    fn test_empty_platform_set_disables_platform_filter() {
        let filter = ChatFilter::new([], "");
        assert_eq!(filter.apply(&fixture()).len(), 5);
    }

    #[test]
    fn test_query_matches_username_or_message_case_insensitively() {
        let filter = ChatFilter::new(Platform::ALL, "  KAPPA ");
        assert_eq!(ids(&filter.apply(&fixture())), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_filters_commute() {
        let messages = fixture();

        let platform_only = ChatFilter::new([Platform::Twitch], "");
        let query_only = ChatFilter::new([], "kappa");
        let combined = ChatFilter::new([Platform::Twitch], "kappa");

        let platform_then_query = query_only.apply(&platform_only.apply(&messages));
        let query_then_platform = platform_only.apply(&query_only.apply(&messages));

        assert_eq!(platform_then_query, query_then_platform);
        assert_eq!(platform_then_query, combined.apply(&messages));
        assert_eq!(ids(&platform_then_query), vec!["1", "3"]);
    }

    #[test]
    fn test_toggle_platform() {
        let mut filter = ChatFilter::default();
        filter.toggle_platform(Platform::Twitch);
        assert!(!filter.is_selected(Platform::Twitch));
        assert!(filter.is_selected(Platform::YouTube));

        filter.toggle_platform(Platform::Twitch);
        assert!(filter.is_selected(Platform::Twitch));
    }

    #[test]
    fn test_message_count() {
        let count = MessageCount::from_messages(&fixture());
        assert_eq!(
            count,
            MessageCount {
                total: 5,
                twitch: 3,
                youtube: 2
            }
        );
    }
}
