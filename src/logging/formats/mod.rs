pub mod compact;
pub mod json;
pub mod pretty;

use std::str::FromStr;

use kvdump_error::{bail, StackError, StatusCode};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{layer::Layer as LayerTrait, registry::LookupSpan};

use super::config::LoggingConfig;

/// Формат строк диагностического лога.
#[derive(Debug, Default, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    /// Одна строка на событие
    #[default]
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = StackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => bail!(StatusCode::InvalidConfig, "unknown log format '{}'", other),
        }
    }
}

/// Слой fmt выбранного формата, пишущий в stderr.
pub fn build_layer<S>(config: &LoggingConfig) -> Box<dyn LayerTrait<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    match config.format {
        LogFormat::Pretty => pretty::build_pretty_layer(config, std::io::stderr, config.ansi),
        LogFormat::Compact => compact::build_compact_layer(config, std::io::stderr, config.ansi),
        LogFormat::Json => json::build_json_layer(config, std::io::stderr, false),
    }
}
