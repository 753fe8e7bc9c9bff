use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::DEFAULT_POLL_INTERVAL_MS;

/// ポーリング状態を管理する構造体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollingState {
    /// 現在のライブチャットID
    pub live_chat_id: String,
    /// 次回リクエスト用のページトークン
    pub next_page_token: Option<String>,
    /// サーバー推奨のポーリング間隔（ミリ秒）
    pub polling_interval_millis: Option<u64>,
    /// ポーリング成功回数
    pub poll_count: u64,
}

impl PollingState {
    pub fn new(live_chat_id: String) -> Self {
        Self {
            live_chat_id,
            next_page_token: None,
            polling_interval_millis: None,
            poll_count: 0,
        }
    }

    /// 次回ポーリングまでの待機時間
    ///
    /// サーバーが間隔を返さなかった場合はデフォルト（5秒）
    pub fn polling_interval(&self) -> Duration {
        Duration::from_millis(self.polling_interval_millis.unwrap_or(DEFAULT_POLL_INTERVAL_MS))
    }

    /// 状態を更新（取得成功後に呼び出す）
    pub fn update(&mut self, next_page_token: Option<String>, polling_interval_millis: Option<u64>) {
        self.next_page_token = next_page_token;
        self.polling_interval_millis = polling_interval_millis;
        self.poll_count += 1;
    }
}
