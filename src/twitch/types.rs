use rand::Rng;
use std::collections::BTreeMap;
use twitch_irc::message::PrivmsgMessage;

use super::emotes::process_emotes;
use crate::chat::types::now_millis;
use crate::chat::{ChatMessage, InvalidMessage, Platform};
use crate::util::username_color;

/// IRCタグのうちチャット表示に使うもの
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TwitchTags {
    pub display_name: Option<String>,
    pub username: Option<String>,
    /// `#RRGGBB`
    pub color: Option<String>,
    /// バッジ名 → バージョン
    pub badges: BTreeMap<String, String>,
    /// エモートID → `"start-end"` 範囲の一覧
    pub emotes: BTreeMap<String, Vec<String>>,
    pub message_id: Option<String>,
    /// サーバー側の受信時刻（エポックミリ秒）
    pub timestamp: Option<i64>,
}

/// チャンネルで受信した1件のチャットイベント
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwitchChatEvent {
    pub channel: String,
    pub tags: TwitchTags,
    pub message: String,
    /// 自分自身が送信したメッセージか
    pub is_self: bool,
}

impl TwitchChatEvent {
    /// twitch-ircのPRIVMSGから変換
    ///
    /// `own_login` はログイン中のユーザー名（匿名接続ならNone）
    pub fn from_privmsg(msg: &PrivmsgMessage, own_login: Option<&str>) -> Self {
        let mut emotes: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for emote in &msg.emotes {
            // char_rangeは終端を含まない
            if emote.char_range.end == 0 {
                continue;
            }
            emotes
                .entry(emote.id.clone())
                .or_default()
                .push(format!("{}-{}", emote.char_range.start, emote.char_range.end - 1));
        }

        let tags = TwitchTags {
            display_name: Some(msg.sender.name.clone()),
            username: Some(msg.sender.login.clone()),
            color: msg
                .name_color
                .as_ref()
                .map(|c| format!("#{:02X}{:02X}{:02X}", c.r, c.g, c.b)),
            badges: msg
                .badges
                .iter()
                .map(|b| (b.name.clone(), b.version.clone()))
                .collect(),
            emotes,
            message_id: Some(msg.message_id.clone()),
            timestamp: Some(msg.server_timestamp.timestamp_millis()),
        };

        Self {
            channel: msg.channel_login.clone(),
            tags,
            message: msg.message_text.clone(),
            is_self: own_login.is_some_and(|login| login.eq_ignore_ascii_case(&msg.sender.login)),
        }
    }

    /// 共通メッセージへ正規化して検証
    pub fn normalize(&self) -> Result<ChatMessage, InvalidMessage> {
        let username = self
            .tags
            .display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .or(self.tags.username.as_deref().filter(|name| !name.trim().is_empty()))
            .unwrap_or("Anonymous")
            .to_string();

        let id = match self.tags.message_id.as_deref().filter(|id| !id.is_empty()) {
            Some(native) => format!("twitch-{}", native),
            None => format!(
                "twitch-{}-{:08x}",
                now_millis(),
                rand::thread_rng().gen::<u32>()
            ),
        };

        let color = self
            .tags
            .color
            .clone()
            .unwrap_or_else(|| username_color(&username));

        ChatMessage {
            id,
            platform: Platform::Twitch,
            emotes: process_emotes(&self.message, &self.tags.emotes),
            message: self.message.clone(),
            timestamp: self.tags.timestamp.unwrap_or_else(now_millis),
            color: Some(color),
            badges: self.tags.badges.keys().cloned().collect(),
            username,
        }
        .validate()
    }
}
