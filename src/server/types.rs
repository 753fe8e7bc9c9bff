use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::websocket::WebSocketState;
use crate::chat::{ChatMessage, Platform};
use crate::notification::Notification;

/// サーバー共有状態
pub type ServerState = Arc<RwLock<WebSocketState>>;

/// WebSocketメッセージ種別
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WsMessage {
    /// 1回のフラッシュで表示リストに反映されたメッセージ
    #[serde(rename = "chat:batch")]
    ChatBatch { payload: Vec<ChatMessage> },

    /// 表示リストのクリア
    #[serde(rename = "chat:clear")]
    ChatClear,

    /// 接続状態の変化
    #[serde(rename = "connection:update")]
    ConnectionUpdate { payload: ConnectionUpdatePayload },

    /// アダプターのエラー
    #[serde(rename = "chat:error")]
    ChatError { payload: ChatErrorPayload },

    #[serde(rename = "notification")]
    Notification { payload: Notification },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionUpdatePayload {
    pub platform: Platform,
    pub connected: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatErrorPayload {
    pub platform: Platform,
    pub message: String,
    pub retrying: bool,
}
