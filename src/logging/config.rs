use kvdump_error::{ensure, DumpResult, StatusCode};
use serde::{Deserialize, Serialize};

use super::formats::LogFormat;

const LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

/// Настройки диагностического лога (всегда stderr: stdout занят дампом).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Уровень для целей `kvdump`; прочие цели логируются с `warn`
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    /// ANSI-цвета
    #[serde(default = "default_true")]
    pub ansi: bool,
    #[serde(default)]
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            ansi: true,
            with_target: false,
        }
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> DumpResult<()> {
        ensure!(
            LEVELS.contains(&self.level.to_ascii_lowercase().as_str()),
            StatusCode::InvalidConfig,
            "unknown log level '{}'",
            self.level
        );
        Ok(())
    }

    /// Директива `EnvFilter`, например `warn,kvdump=info`.
    pub fn build_filter_directive(&self) -> String {
        format!("warn,kvdump={}", self.level.to_ascii_lowercase())
    }
}

fn default_level() -> String {
    "warn".to_string()
}

fn default_true() -> bool {
    true
}
