use std::{
    io::{self, BufWriter, Write},
    process::ExitCode,
    sync::Arc,
    time::Instant,
};

use anyhow::Context;
use clap::Parser;
use kvdump::{
    client::ConnectionFactory,
    config::{Cli, DumpConfig, Settings},
    dump::{Dumper, OutputSink, WriterSink},
    logging::init_logging,
    progress,
};
use tokio::sync::mpsc;
use tracing::info;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("kvdump: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = DumpConfig::try_from(Settings::load(&cli)?)?;
    init_logging(config.logging.clone())?;

    let factory = ConnectionFactory::new(config.connection.clone())?;
    let sink: Arc<dyn OutputSink> = Arc::new(WriterSink::new(BufWriter::new(io::stdout())));
    let mut dumper = Dumper::new(factory, config.options.clone(), sink.clone());

    let progress_task = if config.silent {
        None
    } else {
        let (tx, rx) = mpsc::channel(16);
        dumper = dumper.with_progress(tx);
        Some(tokio::spawn(show_progress(rx)))
    };

    let started = Instant::now();
    let result = dumper.dump(config.target).await;
    // Закрывает канал прогресса
    drop(dumper);
    if let Some(task) = progress_task {
        task.await.context("progress display failed")?;
    }
    sink.flush()?;

    let report = result?;
    info!(
        databases = report.databases.len(),
        keys = report.total_keys(),
        key_errors = report.total_errors(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Dump finished"
    );
    Ok(())
}

async fn show_progress(mut rx: mpsc::Receiver<kvdump::dump::ProgressNotification>) {
    let mut previous = None;
    let mut stderr = io::stderr();
    while let Some(note) = rx.recv().await {
        let _ = write!(stderr, "{}", progress::render(previous, &note));
        let _ = stderr.flush();
        previous = Some(note.db);
    }
    if previous.is_some() {
        let _ = writeln!(stderr);
    }
}
