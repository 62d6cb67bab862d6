use thiserror::Error;

use crate::{ErrorExt, StackError, StatusCode};

/// Ошибки движка дампа.
#[derive(Debug, Error)]
pub enum DumpError {
    /// Сервер сообщил тип значения, который дамп не умеет воспроизвести
    #[error("Key {key} is of unrecognized type {type_name}")]
    UnknownValueType { key: String, type_name: String },

    /// Строка секции keyspace команды INFO не разобрана
    #[error("malformed keyspace line '{line}': {reason}")]
    KeyspaceParse { line: String, reason: String },

    /// Ошибка при обработке одного ключа (получение значения, TTL, запись)
    #[error("failed to dump key {key}: {source}")]
    Key {
        key: String,
        #[source]
        source: StackError,
    },
}

impl ErrorExt for DumpError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::UnknownValueType { .. } => StatusCode::UnknownValueType,
            Self::KeyspaceParse { .. } => StatusCode::KeyspaceParse,
            Self::Key { .. } => StatusCode::KeyFailed,
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl DumpError {
    /// Имя ключа, с которым связана ошибка (если она относится к ключу).
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::UnknownValueType { key, .. } | Self::Key { key, .. } => Some(key),
            _ => None,
        }
    }
}
