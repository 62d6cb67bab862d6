mod cli;
mod settings;

pub use cli::Cli;
pub use settings::{DumpConfig, Settings};
