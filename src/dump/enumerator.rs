//! Перечисление ключей одной базы.
//!
//! Обе стратегии (`SCAN` и `KEYS`) отдают ключи через общий
//! [`BatchEmitter`], поэтому для потребителя они неотличимы: пакеты по
//! `KEY_BATCH_SIZE` ключей, после каждого пакета уведомление с
//! накопленным счётчиком, в конце остаток и финальное уведомление.

use bytes::Bytes;
use kvdump_error::{DumpResult, ResultExt};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use super::types::{EnumerationStrategy, KeyBatch, ProgressNotification, KEY_BATCH_SIZE};
use crate::{client::Executor, network::resp::command_args};

/// Подсказка `COUNT` для каждого шага `SCAN`.
pub const SCAN_COUNT: usize = 100;

/// Накопитель пакетов ключей и счётчика прогресса.
pub struct BatchEmitter<'a> {
    db: u32,
    batches: &'a mpsc::Sender<KeyBatch>,
    progress: Option<&'a mpsc::Sender<ProgressNotification>>,
    pending: KeyBatch,
    dispatched: u64,
    closed: bool,
}

impl<'a> BatchEmitter<'a> {
    pub fn new(
        db: u32,
        batches: &'a mpsc::Sender<KeyBatch>,
        progress: Option<&'a mpsc::Sender<ProgressNotification>>,
    ) -> Self {
        Self {
            db,
            batches,
            progress,
            pending: Vec::with_capacity(KEY_BATCH_SIZE),
            dispatched: 0,
            closed: false,
        }
    }

    /// Очередь закрыта потребителями (дамп остановлен).
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Добавляет ключ; полный пакет сразу отправляется.
    pub async fn push(
        &mut self,
        key: Bytes,
    ) {
        self.pending.push(key);
        if self.pending.len() >= KEY_BATCH_SIZE {
            self.flush().await;
        }
    }

    /// Отправляет остаток и финальное уведомление; возвращает число
    /// отправленных ключей.
    pub async fn finish(mut self) -> u64 {
        if !self.pending.is_empty() {
            self.flush().await;
        } else {
            self.notify().await;
        }
        self.dispatched
    }

    async fn flush(&mut self) {
        if self.closed {
            self.pending.clear();
            return;
        }
        let batch = std::mem::replace(&mut self.pending, Vec::with_capacity(KEY_BATCH_SIZE));
        let len = batch.len() as u64;
        if self.batches.send(batch).await.is_err() {
            debug!(db = self.db, "Key queue closed, stopping enumeration");
            self.closed = true;
            return;
        }
        self.dispatched += len;
        self.notify().await;
    }

    async fn notify(&self) {
        if let Some(progress) = self.progress {
            // Закрытый приёмник прогресса не мешает дампу
            let _ = progress
                .send(ProgressNotification {
                    db: self.db,
                    done: self.dispatched,
                })
                .await;
        }
    }
}

impl EnumerationStrategy {
    /// Перечисляет ключи базы `db`, подходящие под `pattern`.
    pub async fn enumerate<E: Executor + ?Sized>(
        self,
        executor: &E,
        db: u32,
        pattern: &str,
        batches: &mpsc::Sender<KeyBatch>,
        progress: Option<&mpsc::Sender<ProgressNotification>>,
    ) -> DumpResult<u64> {
        let mut emitter = BatchEmitter::new(db, batches, progress);
        match self {
            EnumerationStrategy::Scan => scan_keys(executor, pattern, &mut emitter).await?,
            EnumerationStrategy::Keys => list_keys(executor, pattern, &mut emitter).await?,
        }
        let total = emitter.finish().await;
        debug!(db, strategy = %self, keys = total, "Enumeration finished");
        Ok(total)
    }
}

/// `SCAN cursor MATCH pattern COUNT 100` до возврата курсора `0`.
async fn scan_keys<E: Executor + ?Sized>(
    executor: &E,
    pattern: &str,
    emitter: &mut BatchEmitter<'_>,
) -> DumpResult<()> {
    let count = SCAN_COUNT.to_string();
    let mut cursor = "0".to_string();
    loop {
        let cmd = command_args(["SCAN", cursor.as_str(), "MATCH", pattern, "COUNT", count.as_str()]);
        let (next, keys) = executor
            .execute(&cmd)
            .await
            .and_then(|reply| reply.into_scan_page())
            .with_context(|| format!("SCAN {cursor}"))?;
        trace!(cursor = %next, keys = keys.len(), "SCAN page");

        for key in keys {
            emitter.push(key).await;
        }
        if next == "0" || emitter.is_closed() {
            return Ok(());
        }
        cursor = next;
    }
}

/// Один вызов `KEYS pattern`, затем разбиение на пакеты на клиенте.
async fn list_keys<E: Executor + ?Sized>(
    executor: &E,
    pattern: &str,
    emitter: &mut BatchEmitter<'_>,
) -> DumpResult<()> {
    let keys = executor
        .execute(&command_args(["KEYS", pattern]))
        .await
        .and_then(|reply| reply.into_bytes_vec("KEYS"))
        .context("KEYS")?;

    for key in keys {
        if emitter.is_closed() {
            break;
        }
        emitter.push(key).await;
    }
    Ok(())
}
