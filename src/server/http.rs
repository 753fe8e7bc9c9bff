use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeSet;
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::chat::{render, ChatFilter, ChatMessage, ConnectionSnapshot, MessageCount, Platform};
use crate::session::ChatSession;

/// ルーターを構築
pub fn router(session: ChatSession) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/chat/messages", get(get_messages))
        .route("/api/chat/status", get(get_status))
        .route("/api/chat/clear", post(clear_messages))
        .route("/api/chat/reconnect", post(reconnect))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(session)
}

/// HTTPサーバーを起動
pub async fn start_http_server(
    addr: SocketAddr,
    session: ChatSession,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("HTTP server listening on http://{}", addr);

    axum::serve(listener, router(session)).await?;

    Ok(())
}

/// ヘルスチェックエンドポイント
async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "server": "chat-hub",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[derive(Debug, Default, Deserialize)]
struct MessagesQuery {
    /// カンマ区切りのプラットフォーム（空文字なら絞り込みなし）
    platforms: Option<String>,
    q: Option<String>,
}

/// 表示用HTMLを付けたメッセージ
#[derive(Debug, Serialize)]
struct MessageView {
    #[serde(flatten)]
    message: ChatMessage,
    html: String,
}

fn parse_platforms(raw: &str) -> Result<BTreeSet<Platform>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<Platform>())
        .collect()
}

/// 絞り込み済みの表示リスト
///
/// クエリで指定されなかった条件はセッションの絞り込み条件を使う。
async fn get_messages(
    State(session): State<ChatSession>,
    Query(query): Query<MessagesQuery>,
) -> impl IntoResponse {
    let mut filter: ChatFilter = session.filter();

    if let Some(raw) = query.platforms.as_deref() {
        match parse_platforms(raw) {
            Ok(platforms) => filter.platforms = platforms,
            Err(e) => {
                return (StatusCode::BAD_REQUEST, Json(json!({ "error": e }))).into_response();
            }
        }
    }
    if let Some(q) = query.q {
        filter.query = q;
    }

    let views: Vec<MessageView> = session
        .filtered(&filter)
        .into_iter()
        .map(|message| MessageView {
            html: render(&message.message, &message.emotes),
            message,
        })
        .collect();

    Json(views).into_response()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    connection: ConnectionSnapshot,
    is_connected: bool,
    message_count: MessageCount,
    pending: usize,
    dropped: u64,
    rejected: u64,
}

async fn get_status(State(session): State<ChatSession>) -> impl IntoResponse {
    let connection = session.connection_status();
    Json(StatusResponse {
        connection,
        is_connected: connection.is_connected(),
        message_count: session.message_count(),
        pending: session.buffer().pending_len(),
        dropped: session.dropped_count(),
        rejected: session.rejected_count(),
    })
}

async fn clear_messages(State(session): State<ChatSession>) -> StatusCode {
    session.clear_messages().await;
    StatusCode::NO_CONTENT
}

/// 再接続を予約（完了を待たずに応答）
async fn reconnect(State(session): State<ChatSession>) -> StatusCode {
    tokio::spawn(async move {
        if !session.reconnect().await {
            log::warn!("Reconnect finished with failed connections");
        }
    });
    StatusCode::ACCEPTED
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::EmotePlacement;
    use crate::config::AppConfig;
    use crate::server::create_server_state;
    use crate::youtube::fake::FakeLiveChatApi;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn session() -> ChatSession {
        let config = AppConfig {
            twitch_channel: None,
            youtube_video_id: None,
            ..AppConfig::default()
        };
        ChatSession::start(config, Arc::new(FakeLiveChatApi::new()), create_server_state())
    }

    fn message(id: &str, platform: Platform, text: &str) -> ChatMessage {
        ChatMessage {
            id: id.to_string(),
            platform,
            username: "viewer".to_string(),
            message: text.to_string(),
            timestamp: 1_700_000_000_000,
            color: None,
            badges: BTreeSet::new(),
            emotes: vec![],
        }
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null))
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get_json(router(session()), "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_messages_are_filtered_and_rendered() {
        let session = session();
        let mut kappa = message("t1", Platform::Twitch, "<b>hi</b> Kappa");
        kappa.emotes = vec![EmotePlacement {
            id: "25".to_string(),
            name: "Kappa".to_string(),
            url: "https://static-cdn.jtvnw.net/emoticons/v2/25/default/dark/1.0".to_string(),
            positions: vec![[10, 14]],
        }];
        session.ingest(kappa);
        session.ingest(message("y1", Platform::YouTube, "hello"));
        session.buffer().flush();

        let (status, body) = get_json(router(session.clone()), "/api/chat/messages?platforms=twitch").await;
        assert_eq!(status, StatusCode::OK);
        let items = body.as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["id"], "t1");
        let html = items[0]["html"].as_str().unwrap();
        assert!(html.starts_with("&lt;b&gt;hi&lt;&#x2F;b&gt; <img "));
        assert!(html.contains(r#"alt="Kappa""#));

        let (_, body) = get_json(router(session.clone()), "/api/chat/messages?q=HELLO").await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["id"], "y1");

        // 空指定は絞り込みなし
        let (_, body) = get_json(router(session.clone()), "/api/chat/messages?platforms=").await;
        assert_eq!(body.as_array().unwrap().len(), 2);

        let (status, _) = get_json(router(session), "/api/chat/messages?platforms=mixer").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_status_and_clear() {
        let session = session();
        session.ingest(message("t1", Platform::Twitch, "hi"));
        session.ingest(message("", Platform::Twitch, "no id"));
        session.buffer().flush();

        let (status, body) = get_json(router(session.clone()), "/api/chat/status").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["messageCount"]["total"], 1);
        assert_eq!(body["messageCount"]["twitch"], 1);
        assert_eq!(body["rejected"], 1);
        assert_eq!(body["isConnected"], false);

        let response = router(session.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/chat/clear")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(session.messages().is_empty());
    }

    #[tokio::test]
    async fn test_reconnect_is_accepted() {
        let response = router(session())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/chat/reconnect")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }
}
