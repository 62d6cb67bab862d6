//! Оркестратор дампа.
//!
//! Для одной базы: маркер `SELECT`, пул воркеров на общей очереди пакетов
//! ключей, перечислитель и сборщик ошибок. В режиме «все базы» сначала
//! обнаружение баз и последовательный дамп каждой.

use std::sync::Arc;

use kvdump_error::{
    DumpError, DumpResult, GenericError, LogLevel, ResultExt, StackError, StatusCode,
};
use tokio::{
    sync::{mpsc, watch, Mutex},
    task::JoinSet,
};
use tracing::{debug, error, info, warn};

use super::{
    discovery::discover_databases,
    sink::OutputSink,
    types::{DatabaseReport, DbTarget, DumpOptions, DumpReport, ErrorPolicy, ProgressNotification},
    worker::{KeyFailure, Worker},
};
use crate::client::{ConnectionFactory, Executor};

/// Дамп сервера целиком или одной базы.
pub struct Dumper {
    factory: ConnectionFactory,
    options: DumpOptions,
    sink: Arc<dyn OutputSink>,
    progress: Option<mpsc::Sender<ProgressNotification>>,
}

impl Dumper {
    pub fn new(
        factory: ConnectionFactory,
        options: DumpOptions,
        sink: Arc<dyn OutputSink>,
    ) -> Self {
        Self {
            factory,
            options,
            sink,
            progress: None,
        }
    }

    /// Канал уведомлений о прогрессе.
    pub fn with_progress(
        mut self,
        progress: mpsc::Sender<ProgressNotification>,
    ) -> Self {
        self.progress = Some(progress);
        self
    }

    pub async fn dump(
        &self,
        target: DbTarget,
    ) -> DumpResult<DumpReport> {
        let dbs = match target {
            DbTarget::Single(db) => vec![db],
            DbTarget::All => {
                let pool = self.factory.pool(None).await?;
                discover_databases(&pool).await?
            }
        };
        if dbs.is_empty() {
            warn!("No databases with keys found");
        }

        let mut report = DumpReport::default();
        for db in dbs {
            let pool = Arc::new(self.factory.pool(Some(db)).await?);
            let db_report =
                dump_db(pool, db, &self.options, self.sink.clone(), self.progress.as_ref())
                    .await
                    .with_context(|| format!("db {db}"))?;
            report.databases.push(db_report);
        }
        Ok(report)
    }
}

/// Дамп одной базы через уже подключённый `executor`.
///
/// Ошибки перечисления фатальны; ошибки отдельных ключей обрабатываются
/// по `options.error_policy`.
pub async fn dump_db<E: Executor + 'static>(
    executor: Arc<E>,
    db: u32,
    options: &DumpOptions,
    sink: Arc<dyn OutputSink>,
    progress: Option<&mpsc::Sender<ProgressNotification>>,
) -> DumpResult<DatabaseReport> {
    info!(db, strategy = %options.strategy, workers = options.workers, "Dumping database");
    sink.write_line(&options.output.serialize(&["SELECT".to_string(), db.to_string()]))?;

    let options = Arc::new(options.clone());
    let (batch_tx, batch_rx) = mpsc::channel(1);
    let (failure_tx, failure_rx) = mpsc::channel(1);
    let (stop_tx, stop_rx) = watch::channel(false);

    let collector = tokio::spawn(collect_failures(db, options.error_policy, failure_rx, stop_tx));

    let queue = Arc::new(Mutex::new(batch_rx));
    let mut workers = JoinSet::new();
    for id in 0..options.workers.max(1) {
        let worker = Worker {
            id,
            db,
            executor: executor.clone(),
            queue: queue.clone(),
            sink: sink.clone(),
            options: options.clone(),
            failures: failure_tx.clone(),
            stop: stop_rx.clone(),
        };
        workers.spawn(worker.run());
    }
    // Очередь и канал ошибок закрываются, когда их отпустят воркеры.
    drop(queue);
    drop(failure_tx);

    let enumerated = options
        .strategy
        .enumerate(executor.as_ref(), db, &options.filter, &batch_tx, progress)
        .await;
    drop(batch_tx);

    while let Some(joined) = workers.join_next().await {
        joined.map_err(join_error)?;
    }
    let (errors, first_failure) = collector.await.map_err(join_error)?;

    let keys = enumerated?;
    sink.flush()?;

    if let Some(failure) = first_failure {
        return Err(DumpError::Key {
            key: failure.key_lossy().into_owned(),
            source: failure.error,
        }
        .into());
    }

    info!(db, keys, errors, "Database dumped");
    Ok(DatabaseReport { db, keys, errors })
}

/// Логирует ошибки ключей; в режиме `Abort` останавливает воркеров на
/// первой из них и возвращает её.
async fn collect_failures(
    db: u32,
    policy: ErrorPolicy,
    mut failures: mpsc::Receiver<KeyFailure>,
    stop: watch::Sender<bool>,
) -> (u64, Option<KeyFailure>) {
    let mut count = 0;
    let mut first = None;

    while let Some(failure) = failures.recv().await {
        count += 1;
        log_failure(db, &failure);

        if policy == ErrorPolicy::Abort && first.is_none() {
            warn!(db, "Stopping dump after first key failure");
            let _ = stop.send(true);
            first = Some(failure);
        }
    }
    (count, first)
}

/// Уровень записи берётся из кода статуса ошибки.
fn log_failure(
    db: u32,
    failure: &KeyFailure,
) {
    let key = failure.key_lossy();
    let error = &failure.error;
    match error.log_level() {
        LogLevel::Error => error!(db, %key, %error, "Failed to dump key"),
        LogLevel::Warn => warn!(db, %key, %error, "Failed to dump key"),
        LogLevel::Info => info!(db, %key, %error, "Failed to dump key"),
        LogLevel::Debug => debug!(db, %key, %error, "Failed to dump key"),
    }
}

fn join_error(err: tokio::task::JoinError) -> StackError {
    GenericError::new(StatusCode::Internal, format!("dump task failed: {err}")).into()
}
