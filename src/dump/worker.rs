use std::{borrow::Cow, sync::Arc};

use bytes::Bytes;
use kvdump_error::{DumpResult, StackError};
use tokio::sync::{mpsc, watch, Mutex};
use tracing::trace;

use super::{
    builder::fetch_commands,
    sink::OutputSink,
    types::{DumpOptions, KeyBatch},
};
use crate::client::Executor;

/// Ошибка одного ключа, переданная сборщику ошибок.
#[derive(Debug)]
pub struct KeyFailure {
    pub key: Bytes,
    pub error: StackError,
}

impl KeyFailure {
    /// Имя ключа для логов и сообщений об ошибках.
    pub fn key_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.key)
    }
}

/// Общие для всех воркеров одной базы ресурсы.
pub struct Worker<E: ?Sized> {
    pub id: usize,
    pub db: u32,
    pub executor: Arc<E>,
    pub queue: Arc<Mutex<mpsc::Receiver<KeyBatch>>>,
    pub sink: Arc<dyn OutputSink>,
    pub options: Arc<DumpOptions>,
    pub failures: mpsc::Sender<KeyFailure>,
    pub stop: watch::Receiver<bool>,
}

impl<E: Executor + ?Sized> Worker<E> {
    /// Забирает пакеты из общей очереди, пока она не закрыта или не
    /// поднят флаг остановки.
    pub async fn run(self) -> u64 {
        let mut processed = 0;
        loop {
            let batch = {
                let mut queue = self.queue.lock().await;
                queue.recv().await
            };
            let Some(batch) = batch else {
                break;
            };

            for key in batch {
                if self.stopped() {
                    trace!(worker = self.id, "Stop requested");
                    return processed;
                }
                if let Err(error) = self.dump_key(&key).await {
                    // Сборщик живёт дольше воркеров
                    let _ = self.failures.send(KeyFailure { key, error }).await;
                }
                processed += 1;
            }
        }
        trace!(worker = self.id, db = self.db, processed, "Worker finished");
        processed
    }

    fn stopped(&self) -> bool {
        *self.stop.borrow()
    }

    async fn dump_key(
        &self,
        key: &[u8],
    ) -> DumpResult<()> {
        let now = chrono::Utc::now().timestamp();
        let commands = fetch_commands(self.executor.as_ref(), key, &self.options, now).await?;
        for cmd in &commands {
            self.sink.write_line(&self.options.output.serialize(cmd))?;
        }
        Ok(())
    }
}
