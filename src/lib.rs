pub mod adapter;
pub mod chat;
pub mod config;
pub mod notification;
pub mod placeholder;
pub mod server;
pub mod session;
pub mod twitch;
pub mod util; // doctestのためpubにする
pub mod youtube;

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::session::ChatSession;
use crate::youtube::YouTubeChatClient;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// ログ出力を初期化（`RUST_LOG` 未設定ならinfo）
///
/// `log` クレート経由の出力もtracing-subscriberで表示される。
fn init_logging() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// サービスを起動し、Ctrl+Cを受けるまで動作する
pub async fn run() -> Result<(), BoxError> {
  init_logging();

  let config = AppConfig::from_env()?;
  log::info!(
    "Starting chat-hub (http: {}, ws: {}, backend: {})",
    config.http_addr,
    config.ws_addr,
    config.api_base_url
  );
  if let Some(token) = config.api_token.as_deref() {
    log::info!("Using chat backend token {}", util::mask_api_key(token));
  }

  // WebSocket配信用の共有状態
  let server_state = server::create_server_state();

  let client = YouTubeChatClient::from_config(&config)?;
  let session = ChatSession::start(config.clone(), Arc::new(client), Arc::clone(&server_state));

  // WebSocketサーバーを起動
  {
    let state_clone = Arc::clone(&server_state);
    let addr = config.ws_addr;
    tokio::spawn(async move {
      if let Err(e) = server::start_websocket_server(addr, state_clone).await {
        log::error!("WebSocket server error: {}", e);
      }
    });
  }

  // HTTPサーバーを起動
  {
    let http_session = session.clone();
    let addr = config.http_addr;
    tokio::spawn(async move {
      if let Err(e) = server::start_http_server(addr, http_session).await {
        log::error!("HTTP server error: {}", e);
      }
    });
  }

  if !session.initialize().await {
    log::warn!("Some chat connections failed during startup");
  }

  tokio::signal::ctrl_c().await?;
  log::info!("Shutdown requested");

  session.shutdown().await;
  Ok(())
}
