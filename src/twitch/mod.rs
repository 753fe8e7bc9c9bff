//! Twitch IRCチャット

pub mod adapter;
pub mod emotes;
pub mod errors;
pub mod types;

pub use adapter::TwitchAdapter;
pub use errors::TwitchError;
