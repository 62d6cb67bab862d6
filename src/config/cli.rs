use std::path::PathBuf;

use clap::Parser;

/// Аргументы командной строки.
///
/// Все значения необязательны: незаданные берутся из переменных окружения
/// `KVDUMP_*`, затем из значений по умолчанию (см. [`super::Settings`]).
#[derive(Debug, Default, Parser)]
#[command(name = "kvdump")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_COMMIT"), ")"))]
#[command(
    about = "Dump a Redis-compatible server as RESP frames or commands",
    long_about = "Dump a Redis-compatible server as RESP frames or commands.\n\
                  The password is read from the KVDUMP_AUTH environment variable."
)]
pub struct Cli {
    /// Server host
    #[arg(long)]
    pub host: Option<String>,
    /// Server port
    #[arg(long)]
    pub port: Option<u16>,
    /// Database to dump; -1 or absent dumps every non-empty database
    #[arg(long, allow_negative_numbers = true)]
    pub db: Option<i64>,
    /// ACL username (requires KVDUMP_AUTH)
    #[arg(long)]
    pub user: Option<String>,
    /// Glob pattern of keys to dump
    #[arg(long)]
    pub filter: Option<String>,
    /// Use KEYS instead of SCAN (servers without SCAN)
    #[arg(long)]
    pub noscan: bool,
    /// Maximum number of items per generated command
    #[arg(long)]
    pub batch_size: Option<usize>,
    /// Concurrent workers per database
    #[arg(short = 'n', long)]
    pub workers: Option<usize>,
    /// Preserve key expirations with EXPIREAT (--ttl=false disables)
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub ttl: Option<bool>,
    /// Output format: resp or commands
    #[arg(long)]
    pub output: Option<String>,
    /// Do not print progress to stderr
    #[arg(short = 's', long)]
    pub silent: bool,
    /// Connect over TLS
    #[arg(long)]
    pub tls: bool,
    /// Skip verification of the server certificate
    #[arg(long)]
    pub insecure: bool,
    /// PEM bundle of trusted CAs
    #[arg(long)]
    pub cacert: Option<PathBuf>,
    /// Client certificate (PEM)
    #[arg(long)]
    pub cert: Option<PathBuf>,
    /// Client private key (PEM)
    #[arg(long)]
    pub key: Option<PathBuf>,
    /// Per-key error handling: continue or abort
    #[arg(long)]
    pub on_error: Option<String>,
    /// Log level for kvdump targets (default: warn)
    #[arg(long)]
    pub log_level: Option<String>,
    /// Log format: compact, pretty or json
    #[arg(long)]
    pub log_format: Option<String>,
}
