use thiserror::Error;

#[derive(Error, Debug)]
pub enum YouTubeError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Chat backend rejected the request")]
    Unauthorized,

    #[error("No YouTube access token available")]
    NoAccessToken,

    #[error("Live chat not found or disabled")]
    LiveChatNotFound,

    #[error("YouTube chat is not initialized")]
    NotInitialized,

    #[error("Poller is already running")]
    PollerAlreadyRunning,

    #[error("Unexpected status from chat backend: {0}")]
    UnexpectedStatus(u16),

    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

impl From<YouTubeError> for String {
    fn from(err: YouTubeError) -> String {
        err.to_string()
    }
}
