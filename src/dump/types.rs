use std::{fmt, str::FromStr};

use bytes::Bytes;
use kvdump_error::{bail, StackError, StatusCode};

use crate::network::resp::OutputFormat;

/// Размер пакета ключей, передаваемого воркеру.
pub const KEY_BATCH_SIZE: usize = 100;

/// Пакет ключей: единица работы воркера. Имена ключей бинарные.
pub type KeyBatch = Vec<Bytes>;

/// Команда записи: имя команды и аргументы.
pub type WriteCommand = Vec<Bytes>;

/// Тип значения ключа, как его сообщает `TYPE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueType {
    String,
    List,
    Set,
    Hash,
    SortedSet,
    /// Ключ исчез между перечислением и чтением
    None,
    /// Тип, который дамп не умеет воспроизвести (stream, модульные типы...)
    Unknown(String),
}

impl ValueType {
    pub fn parse(reply: &str) -> Self {
        match reply {
            "string" => ValueType::String,
            "list" => ValueType::List,
            "set" => ValueType::Set,
            "hash" => ValueType::Hash,
            "zset" => ValueType::SortedSet,
            "none" => ValueType::None,
            other => ValueType::Unknown(other.to_string()),
        }
    }
}

/// Прогресс дампа одной базы: сколько ключей отдано воркерам.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressNotification {
    pub db: u32,
    pub done: u64,
}

/// Какие базы дампить.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbTarget {
    /// Все непустые базы из `INFO keyspace`
    All,
    Single(u32),
}

/// Реакция на ошибку отдельного ключа.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Залогировать, посчитать и продолжить
    #[default]
    Continue,
    /// Остановить дамп базы на первой ошибке
    Abort,
}

impl FromStr for ErrorPolicy {
    type Err = StackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "continue" => Ok(ErrorPolicy::Continue),
            "abort" => Ok(ErrorPolicy::Abort),
            other => bail!(
                StatusCode::InvalidConfig,
                "unknown error policy '{}' (expected continue or abort)",
                other
            ),
        }
    }
}

/// Способ перечисления ключей.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EnumerationStrategy {
    /// Инкрементальный `SCAN` с курсором
    #[default]
    Scan,
    /// Один вызов `KEYS` (для старых серверов без `SCAN`)
    Keys,
}

impl fmt::Display for EnumerationStrategy {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            EnumerationStrategy::Scan => write!(f, "scan"),
            EnumerationStrategy::Keys => write!(f, "keys"),
        }
    }
}

/// Параметры дампа, не связанные с подключением.
#[derive(Debug, Clone)]
pub struct DumpOptions {
    /// Glob-шаблон имён ключей
    pub filter: String,
    pub strategy: EnumerationStrategy,
    /// Число воркеров на базу
    pub workers: usize,
    /// Максимум элементов (пар для hash и zset) в одной команде
    pub batch_size: usize,
    /// Сохранять TTL через `EXPIREAT`
    pub with_ttl: bool,
    pub output: OutputFormat,
    pub error_policy: ErrorPolicy,
}

impl Default for DumpOptions {
    fn default() -> Self {
        Self {
            filter: "*".to_string(),
            strategy: EnumerationStrategy::Scan,
            workers: 10,
            batch_size: 1000,
            with_ttl: true,
            output: OutputFormat::Resp,
            error_policy: ErrorPolicy::Continue,
        }
    }
}

/// Итог дампа одной базы.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseReport {
    pub db: u32,
    /// Ключей передано воркерам
    pub keys: u64,
    /// Ключей, завершившихся ошибкой
    pub errors: u64,
}

/// Итог всего дампа.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DumpReport {
    pub databases: Vec<DatabaseReport>,
}

impl DumpReport {
    pub fn total_keys(&self) -> u64 {
        self.databases.iter().map(|d| d.keys).sum()
    }

    pub fn total_errors(&self) -> u64 {
        self.databases.iter().map(|d| d.errors).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_type_parse() {
        assert_eq!(ValueType::parse("zset"), ValueType::SortedSet);
        assert_eq!(ValueType::parse("none"), ValueType::None);
        assert_eq!(ValueType::parse("stream"), ValueType::Unknown("stream".to_string()));
    }

    #[test]
    fn test_error_policy_from_str() {
        assert_eq!("abort".parse::<ErrorPolicy>().unwrap(), ErrorPolicy::Abort);
        assert_eq!("Continue".parse::<ErrorPolicy>().unwrap(), ErrorPolicy::Continue);
        let err = "retry".parse::<ErrorPolicy>().unwrap_err();
        assert_eq!(err.status_code(), StatusCode::InvalidConfig);
    }

    #[test]
    fn test_report_totals() {
        let report = DumpReport {
            databases: vec![
                DatabaseReport { db: 0, keys: 120, errors: 1 },
                DatabaseReport { db: 3, keys: 5, errors: 0 },
            ],
        };
        assert_eq!(report.total_keys(), 125);
        assert_eq!(report.total_errors(), 1);
    }
}
