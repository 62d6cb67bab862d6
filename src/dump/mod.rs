pub mod builder;
pub mod discovery;
pub mod enumerator;
pub mod orchestrator;
pub mod sink;
pub mod types;
pub mod worker;

pub use builder::{fetch_commands, fetch_value, value_commands, Value};
pub use discovery::{discover_databases, parse_keyspace_info};
pub use enumerator::{BatchEmitter, SCAN_COUNT};
pub use orchestrator::{dump_db, Dumper};
pub use sink::{OutputSink, WriterSink};
pub use types::*;
pub use worker::KeyFailure;
