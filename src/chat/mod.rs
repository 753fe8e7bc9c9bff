//! チャット集約の中核
//!
//! アダプター → 共通メッセージへの正規化 → バッファ → 一定間隔のフラッシュ → 絞り込み表示
//! の一方向の流れを構成する部品をまとめる。

pub mod buffer;
pub mod filter;
pub mod render;
pub mod status;
pub mod types;

pub use buffer::{spawn_flush_task, MessageBuffer};
pub use filter::{ChatFilter, MessageCount};
pub use render::{render, sanitize};
pub use status::{ConnectionSnapshot, ConnectionStatus};
pub use types::{ChatMessage, EmotePlacement, InvalidMessage, Platform};
