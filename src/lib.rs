/// Connection layer: TLS, authentication, pooling and the `Executor` seam.
pub mod client;
/// Settings from defaults, `KVDUMP_*` environment variables and CLI flags.
pub mod config;
/// The dump engine: command builder, key enumeration, database discovery,
/// worker pool and orchestration.
pub mod dump;
/// Diagnostic logging to stderr (filters and formats).
pub mod logging;
/// RESP2 framing: reply decoding and command serialization.
pub mod network;
/// Progress line rendering for terminals.
pub mod progress;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

pub use client::{ConnectionConfig, ConnectionFactory, Executor, Pool, TlsOptions};
pub use config::{Cli, DumpConfig, Settings};
pub use dump::{
    dump_db, DatabaseReport, DbTarget, DumpOptions, DumpReport, Dumper, EnumerationStrategy,
    ErrorPolicy, OutputSink, ProgressNotification, WriterSink,
};
pub use kvdump_error::{DumpResult, StackError, StatusCode};
pub use network::resp::{OutputFormat, Reply};
