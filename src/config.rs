// =============================================================================
// 共通設定・定数モジュール
// =============================================================================
// チャット集約サービス全体で使用する設定値・定数と、
// 環境変数から読み込むアプリケーション設定を定義
// =============================================================================

use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// HTTPリクエストのデフォルトタイムアウト（秒）
///
/// バックエンドのYouTubeチャットAPIへのリクエストで使用。
/// ロングポーリング自体にはタイムアウトを設けない（ポーラー側で制御しない）。
pub const HTTP_TIMEOUT_SECS: u64 = 10;

/// 表示リストの最大保持件数
pub const MAX_MESSAGES: usize = 100;

/// 保留キューの最大件数（超過時は最も古いものを破棄）
pub const MAX_PENDING_MESSAGES: usize = 10_000;

/// バッファのフラッシュ間隔（ミリ秒）
pub const FLUSH_INTERVAL_MS: u64 = 100;

/// サーバーからポーリング間隔が返されなかった場合の待機時間（ミリ秒）
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5000;

/// 取得失敗時の再試行までの待機時間（ミリ秒）
pub const ERROR_RETRY_DELAY_MS: u64 = 10_000;

/// 再接続時の切断から初期化までの待機時間（ミリ秒）
pub const RECONNECT_DELAY_MS: u64 = 1000;

/// Twitchチャンネル参加確認の待機上限（秒）
pub const TWITCH_JOIN_TIMEOUT_SECS: u64 = 10;

const DEFAULT_HTTP_PORT: u16 = 19800;
const DEFAULT_WS_PORT: u16 = 19801;
const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:3000/api";

/// HTTPリクエストのデフォルトタイムアウト（Duration）
///
/// HTTPクライアント構築時に直接使用可能
pub fn http_timeout() -> Duration {
    Duration::from_secs(HTTP_TIMEOUT_SECS)
}

pub fn flush_interval() -> Duration {
    Duration::from_millis(FLUSH_INTERVAL_MS)
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid socket address in {name}: {value}")]
    InvalidAddr { name: &'static str, value: String },

    #[error("Invalid number in {name}: {value}")]
    InvalidNumber { name: &'static str, value: String },
}

/// 環境変数から読み込むアプリケーション設定
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// HTTPサーバーの待受アドレス
    pub http_addr: SocketAddr,
    /// WebSocketサーバーの待受アドレス
    pub ws_addr: SocketAddr,
    /// YouTubeチャット中継APIのベースURL
    pub api_base_url: String,
    /// 中継APIへ送るBearerトークン
    pub api_token: Option<String>,
    /// 読み取るTwitchチャンネル（未設定なら接続しない）
    pub twitch_channel: Option<String>,
    /// YouTube動画ID（未設定ならシミュレーション表示）
    pub youtube_video_id: Option<String>,
    /// 表示リストの最大保持件数
    pub max_messages: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http_addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_HTTP_PORT)),
            ws_addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_WS_PORT)),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_token: None,
            twitch_channel: None,
            youtube_video_id: None,
            max_messages: MAX_MESSAGES,
        }
    }
}

impl AppConfig {
    /// プロセス環境変数から設定を読み込む
    ///
    /// `.env` があれば先に読み込む（既存の環境変数は上書きしない）
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 任意のキー検索関数から設定を構築（テスト用に分離）
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        // 空文字列は未設定として扱う
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let http_addr = match get("CHAT_HTTP_ADDR") {
            Some(v) => parse_addr("CHAT_HTTP_ADDR", v)?,
            None => defaults.http_addr,
        };
        let ws_addr = match get("CHAT_WS_ADDR") {
            Some(v) => parse_addr("CHAT_WS_ADDR", v)?,
            None => defaults.ws_addr,
        };
        let max_messages = match get("CHAT_MAX_MESSAGES") {
            Some(v) => match v.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidNumber {
                        name: "CHAT_MAX_MESSAGES",
                        value: v,
                    })
                }
            },
            None => defaults.max_messages,
        };

        Ok(Self {
            http_addr,
            ws_addr,
            api_base_url: get("CHAT_API_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base_url),
            api_token: get("CHAT_API_TOKEN"),
            twitch_channel: get("TWITCH_CHANNEL"),
            youtube_video_id: get("YOUTUBE_VIDEO_ID"),
            max_messages,
        })
    }
}

fn parse_addr(name: &'static str, value: String) -> Result<SocketAddr, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::InvalidAddr { name, value })
}
