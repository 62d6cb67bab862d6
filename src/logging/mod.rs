pub mod config;
mod filters;
pub mod formats;

pub use config::LoggingConfig;
pub use formats::LogFormat;
use kvdump_error::{DumpResult, GenericError, StatusCode};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Инициализация логирования с конфигурацией.
pub fn init_logging(config: LoggingConfig) -> DumpResult<()> {
    config.validate()?;

    let env_filter = filters::build_filter_from_config(&config);
    let layer = formats::build_layer(&config);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layer)
        .try_init()
        .map_err(|e| {
            GenericError::new(StatusCode::Internal, format!("failed to install logger: {e}"))
        })?;

    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        commit = env!("GIT_COMMIT"),
        built = env!("BUILD_TIME"),
        log_level = %config.level,
        format = ?config.format,
        "Logging initialized"
    );
    Ok(())
}
