//! YouTubeライブチャット（中継APIのポーリング）

pub mod client;
pub mod errors;
pub mod poller;
pub mod state;
pub mod types;

#[cfg(test)]
pub(crate) mod fake;

pub use client::{LiveChatApi, YouTubeChatClient};
pub use errors::YouTubeError;
pub use poller::{PollerPhase, YouTubeChatPoller};
