// =============================================================================
// メッセージバッファ
// =============================================================================
// 各アダプターから届くメッセージを保留キューに溜め、一定間隔のフラッシュで
// 表示リストへ到着順にまとめて反映する。表示リストは最大件数を超えると
// 先頭（最も古いもの）から切り詰める。
// =============================================================================

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::types::ChatMessage;
use crate::config::{MAX_MESSAGES, MAX_PENDING_MESSAGES};

#[derive(Debug, Default)]
struct BufferInner {
    pending: VecDeque<ChatMessage>,
    display: VecDeque<ChatMessage>,
}

/// 保留キューと表示リストを一体で管理するバッファ
///
/// 両方を同じロックで保護するため、`flush` と `clear` が途中で交錯することはない。
/// クローンは同じバッファを指すハンドルになる。
#[derive(Debug, Clone)]
pub struct MessageBuffer {
    inner: Arc<Mutex<BufferInner>>,
    max_messages: usize,
    max_pending: usize,
    dropped: Arc<AtomicU64>,
}

impl MessageBuffer {
    pub fn new() -> Self {
        Self::with_limits(MAX_MESSAGES, MAX_PENDING_MESSAGES)
    }

    /// 表示上限と保留上限を指定して作成
    pub fn with_limits(max_messages: usize, max_pending: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(BufferInner::default())),
            max_messages: max_messages.max(1),
            max_pending: max_pending.max(1),
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BufferInner> {
        // 保持中にパニックする処理はないため、ポイズンされても中身はそのまま使える
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 保留キューへ追加（ブロックしない）
    ///
    /// 保留上限を超えた場合は最も古い保留メッセージを破棄し、破棄数を加算する
    pub fn enqueue(&self, message: ChatMessage) {
        let mut inner = self.lock();
        if inner.pending.len() >= self.max_pending {
            if let Some(lost) = inner.pending.pop_front() {
                let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                log::warn!(
                    "Pending queue full ({}), dropped message {} (total dropped: {})",
                    self.max_pending,
                    lost.id,
                    total
                );
            }
        }
        inner.pending.push_back(message);
    }

    /// 保留中のメッセージを全て表示リストへ移す
    ///
    /// 反映されたメッセージ（到着順）を返す。保留が空なら空のVecを返す。
    pub fn flush(&self) -> Vec<ChatMessage> {
        let mut inner = self.lock();
        if inner.pending.is_empty() {
            return Vec::new();
        }

        let batch: Vec<ChatMessage> = inner.pending.drain(..).collect();
        inner.display.extend(batch.iter().cloned());

        // 最新max件のみ残す
        let overflow = inner.display.len().saturating_sub(self.max_messages);
        if overflow > 0 {
            inner.display.drain(..overflow);
        }

        batch
    }

    /// 保留キューと表示リストを同時に空にする
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.pending.clear();
        inner.display.clear();
    }

    /// 表示リストのスナップショット（古い順）
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.lock().display.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().display.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().display.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    /// 保留上限超過で破棄されたメッセージ数
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Default for MessageBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// 一定間隔でフラッシュするタスクを起動
///
/// フラッシュで反映があった場合のみ `on_flush` を呼ぶ。
/// `cancel` がキャンセルされるとタスクは終了する。
pub fn spawn_flush_task<F, Fut>(
    buffer: MessageBuffer,
    interval: Duration,
    cancel: CancellationToken,
    on_flush: F,
) -> JoinHandle<()>
where
    F: Fn(Vec<ChatMessage>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let batch = buffer.flush();
                    if !batch.is_empty() {
                        log::debug!("Flushed {} messages", batch.len());
                        on_flush(batch).await;
                    }
                }
            }
        }

        log::info!("Flush task ended");
    })
}
