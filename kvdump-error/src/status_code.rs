use std::fmt;

use num_enum::TryFromPrimitive;

/// Коды статуса для категоризации ошибок.
///
/// # Диапазоны:
/// - 1xxx: Общие ошибки и конфигурация
/// - 2xxx: Ошибки данных
/// - 3xxx: Авторизация
/// - 6xxx: Сеть / IO / TLS
/// - 8xxx: Протокольные ошибки
/// - 9xxx: Ошибки дампа
///
/// `num_enum::TryFromPrimitive` даёт нативную реализацию `TryFrom<u32>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u32)]
#[non_exhaustive]
pub enum StatusCode {
    // === 1xxx: Общие ошибки ===
    Internal = 1003,
    InvalidConfig = 1005,

    // === 2xxx: Ошибки данных ===
    NotFound = 2000,

    // === 3xxx: Авторизация ===
    PermissionDenied = 3001,
    InvalidCredentials = 3002,

    // === 6xxx: Сеть/IO ===
    Io = 6000,
    ConnectionClosed = 6001,
    Timeout = 6002,
    ProtocolError = 6003,
    ConnectionFailed = 6004,
    UnexpectedEof = 6005,
    TlsFailed = 6006,
    CertificateError = 6007,

    // === 8xxx: Протокол ===
    InvalidFrame = 8000,
    InvalidUtf8 = 8001,
    ServerError = 8004,

    // === 9xxx: Дамп ===
    UnknownValueType = 9000,
    KeyspaceParse = 9001,
    KeyFailed = 9002,
}

/// Уровень, с которым ошибка попадает в лог.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl StatusCode {
    /// Числовое представление кода статуса.
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Рекомендуемый уровень логирования для данного кода.
    pub fn log_level(&self) -> LogLevel {
        match self {
            Self::NotFound => LogLevel::Debug,
            Self::InvalidConfig => LogLevel::Info,
            Self::Internal
            | Self::PermissionDenied
            | Self::InvalidCredentials
            | Self::TlsFailed
            | Self::CertificateError
            | Self::UnknownValueType
            | Self::KeyFailed => LogLevel::Error,
            _ => LogLevel::Warn,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для StatusCode
////////////////////////////////////////////////////////////////////////////////

impl From<StatusCode> for u32 {
    fn from(c: StatusCode) -> Self {
        c.code()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{:?} ({})", self, self.code())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
