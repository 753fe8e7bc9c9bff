use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use super::types::Platform;

/// プラットフォームごとの接続状態
#[derive(Debug, Clone, Default)]
pub struct ConnectionStatus {
    flags: Arc<RwLock<BTreeMap<Platform, bool>>>,
}

/// 接続状態のスナップショット
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSnapshot {
    pub twitch: bool,
    pub youtube: bool,
}

impl ConnectionSnapshot {
    /// いずれかに接続中か
    pub fn is_connected(&self) -> bool {
        self.twitch || self.youtube
    }
}

impl ConnectionStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// 状態を設定し、変化があればtrueを返す
    pub fn set(&self, platform: Platform, connected: bool) -> bool {
        let mut flags = self.flags.write().unwrap_or_else(|e| e.into_inner());
        flags.insert(platform, connected) != Some(connected)
    }

    pub fn get(&self, platform: Platform) -> bool {
        self.flags
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&platform)
            .copied()
            .unwrap_or(false)
    }

    pub fn snapshot(&self) -> ConnectionSnapshot {
        ConnectionSnapshot {
            twitch: self.get(Platform::Twitch),
            youtube: self.get(Platform::YouTube),
        }
    }
}
