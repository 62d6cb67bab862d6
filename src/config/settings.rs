use std::path::PathBuf;

use config::{Config, ConfigError, Environment};
use kvdump_error::{ensure, DumpResult, GenericError, StackError, StatusCode};
use serde::{Deserialize, Serialize};

use super::Cli;
use crate::{
    client::{ConnectionConfig, TlsOptions},
    dump::{DbTarget, DumpOptions, EnumerationStrategy},
    logging::LoggingConfig,
};

/// Сырые настройки: значения по умолчанию, затем `KVDUMP_*`, затем флаги.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    /// `-1` (или отсутствие): все базы
    pub db: Option<i64>,
    pub user: Option<String>,
    /// Пароль (`KVDUMP_AUTH`)
    pub auth: Option<String>,
    pub filter: String,
    pub noscan: bool,
    pub batch_size: usize,
    pub workers: usize,
    pub ttl: bool,
    pub output: String,
    pub silent: bool,
    pub tls: bool,
    pub insecure: bool,
    pub cacert: Option<PathBuf>,
    pub cert: Option<PathBuf>,
    pub key: Option<PathBuf>,
    pub on_error: String,
    pub log_level: String,
    pub log_format: String,
}

impl Settings {
    pub fn load(cli: &Cli) -> DumpResult<Self> {
        Self::build(cli).map_err(config_error)
    }

    fn build(cli: &Cli) -> Result<Self, ConfigError> {
        let path = |p: &Option<PathBuf>| p.as_ref().map(|p| p.to_string_lossy().into_owned());

        let cfg = Config::builder()
            // Значения по умолчанию
            .set_default("host", "127.0.0.1")?
            .set_default("port", 6379)?
            .set_default("filter", "*")?
            .set_default("noscan", false)?
            .set_default("batch_size", 1000)?
            .set_default("workers", 10)?
            .set_default("ttl", true)?
            .set_default("output", "resp")?
            .set_default("silent", false)?
            .set_default("tls", false)?
            .set_default("insecure", false)?
            .set_default("on_error", "continue")?
            .set_default("log_level", "warn")?
            .set_default("log_format", "compact")?
            // Переменные окружения с префиксом KVDUMP_
            .add_source(Environment::with_prefix("KVDUMP").try_parsing(true))
            // Флаги командной строки
            .set_override_option("host", cli.host.clone())?
            .set_override_option("port", cli.port.map(i64::from))?
            .set_override_option("db", cli.db)?
            .set_override_option("user", cli.user.clone())?
            .set_override_option("filter", cli.filter.clone())?
            .set_override_option("noscan", cli.noscan.then_some(true))?
            .set_override_option("batch_size", cli.batch_size.map(|n| n as i64))?
            .set_override_option("workers", cli.workers.map(|n| n as i64))?
            .set_override_option("ttl", cli.ttl)?
            .set_override_option("output", cli.output.clone())?
            .set_override_option("silent", cli.silent.then_some(true))?
            .set_override_option("tls", cli.tls.then_some(true))?
            .set_override_option("insecure", cli.insecure.then_some(true))?
            .set_override_option("cacert", path(&cli.cacert))?
            .set_override_option("cert", path(&cli.cert))?
            .set_override_option("key", path(&cli.key))?
            .set_override_option("on_error", cli.on_error.clone())?
            .set_override_option("log_level", cli.log_level.clone())?
            .set_override_option("log_format", cli.log_format.clone())?
            .build()?;

        cfg.try_deserialize()
    }
}

fn config_error(err: ConfigError) -> StackError {
    GenericError::new(StatusCode::InvalidConfig, format!("invalid configuration: {err}")).into()
}

/// Проверенная конфигурация запуска.
#[derive(Debug, Clone)]
pub struct DumpConfig {
    pub connection: ConnectionConfig,
    pub target: DbTarget,
    pub options: DumpOptions,
    /// Не выводить прогресс
    pub silent: bool,
    pub logging: LoggingConfig,
}

impl TryFrom<Settings> for DumpConfig {
    type Error = StackError;

    fn try_from(s: Settings) -> Result<Self, Self::Error> {
        ensure!(s.workers > 0, StatusCode::InvalidConfig, "workers must be at least 1");
        ensure!(s.batch_size > 0, StatusCode::InvalidConfig, "batch size must be at least 1");
        ensure!(
            s.user.is_none() || s.auth.is_some(),
            StatusCode::InvalidConfig,
            "a username requires a password (KVDUMP_AUTH)"
        );

        let target = match s.db {
            None | Some(-1) => DbTarget::All,
            Some(db) => DbTarget::Single(u32::try_from(db).map_err(|_| {
                GenericError::new(StatusCode::InvalidConfig, format!("invalid database index {db}"))
            })?),
        };

        let tls = s.tls.then(|| TlsOptions {
            ca_cert: s.cacert.clone(),
            cert: s.cert.clone(),
            key: s.key.clone(),
            insecure: s.insecure,
        });

        let connection = ConnectionConfig {
            host: s.host,
            port: s.port,
            username: s.user,
            password: s.auth,
            tls,
            pool_size: s.workers,
            ..Default::default()
        };

        let options = DumpOptions {
            filter: s.filter,
            strategy: if s.noscan {
                EnumerationStrategy::Keys
            } else {
                EnumerationStrategy::Scan
            },
            workers: s.workers,
            batch_size: s.batch_size,
            with_ttl: s.ttl,
            output: s.output.parse()?,
            error_policy: s.on_error.parse()?,
        };

        let logging = LoggingConfig {
            level: s.log_level,
            format: s.log_format.parse()?,
            ..Default::default()
        };
        logging.validate()?;

        Ok(Self {
            connection,
            target,
            options,
            silent: s.silent,
            logging,
        })
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
