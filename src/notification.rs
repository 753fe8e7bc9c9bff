//! ユーザー向け通知
//!
//! 送りっぱなし（応答なし）。表示時間の管理は受け取る側のUIに任せる。

use serde::{Deserialize, Serialize};

/// 通知の種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// 表示時間（ミリ秒）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
}

impl Notification {
    pub fn new(kind: NotificationKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: format!("notification-{}", uuid::Uuid::new_v4()),
            kind,
            title: title.into(),
            message: Some(message.into()),
            duration: None,
        }
    }

    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Success, title, message)
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Error, title, message)
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Warning, title, message)
    }

    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Info, title, message)
    }
}

/// 通知の送り先
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// 通知をログに出力するだけのシンク
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn notify(&self, notification: Notification) {
        let detail = notification.message.as_deref().unwrap_or("");
        match notification.kind {
            NotificationKind::Error => log::error!("[{}] {}", notification.title, detail),
            NotificationKind::Warning => log::warn!("[{}] {}", notification.title, detail),
            NotificationKind::Success | NotificationKind::Info => {
                log::info!("[{}] {}", notification.title, detail)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_shape() {
        let n = Notification::warning("Twitch Chat Disconnected", "Lost connection to Twitch chat");
        let json = serde_json::to_value(&n).unwrap();

        assert_eq!(json["type"], "warning");
        assert_eq!(json["title"], "Twitch Chat Disconnected");
        assert_eq!(json["message"], "Lost connection to Twitch chat");
        assert!(json.get("duration").is_none());
        assert!(json["id"].as_str().unwrap().starts_with("notification-"));
    }

    #[test]
    fn test_ids_are_unique() {
        let a = Notification::info("a", "");
        let b = Notification::info("a", "");
        assert_ne!(a.id, b.id);
    }
}
