use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TwitchError {
    #[error("Invalid Twitch channel name: {0:?}")]
    InvalidChannel(String),

    #[error("Failed to join Twitch channel: {0}")]
    JoinFailed(String),

    #[error("Timed out waiting to join Twitch channel")]
    JoinTimeout,

    #[error("Twitch adapter not initialized")]
    NotInitialized,
}

impl From<TwitchError> for String {
    fn from(err: TwitchError) -> String {
        err.to_string()
    }
}
