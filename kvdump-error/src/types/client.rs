use std::io;

use crate::{ErrorExt, StatusCode};

/// Ошибки клиента (соединение с сервером и обмен RESP-фреймами).
#[derive(Debug, Clone)]
pub enum ClientError {
    /// Ошибка подключения к серверу
    ConnectionFailed { address: String, reason: String },
    /// Таймаут подключения
    ConnectionTimeout { address: String },
    /// Соединение закрыто сервером
    ConnectionClosed,
    /// Ответ-ошибка от сервера (`-ERR ...`)
    ServerError { message: String },
    /// Ответ не того вида, который ожидался для команды
    UnexpectedResponse { command: String, reply: String },
    /// Ошибка аутентификации
    AuthenticationFailed { reason: String },
    /// Ошибка ввода-вывода
    Io {
        kind: io::ErrorKind,
        message: String,
    },
    /// Нарушение протокола RESP
    Protocol { reason: String },
    /// Данные ответа не удалось декодировать (например, не UTF-8)
    DecodingError { reason: String },
    /// TLS-рукопожатие не удалось
    Handshake { address: String, reason: String },
}

impl std::fmt::Display for ClientError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Self::ConnectionFailed { address, reason } => {
                write!(f, "Failed to connect to {address}: {reason}")
            }
            Self::ConnectionTimeout { address } => write!(f, "Connection to {address} timed out"),
            Self::ConnectionClosed => write!(f, "Connection closed by server"),
            Self::ServerError { message } => write!(f, "Server error: {message}"),
            Self::UnexpectedResponse { command, reply } => {
                write!(f, "Unexpected response to {command}: {reply}")
            }
            Self::AuthenticationFailed { reason } => {
                write!(f, "Authentication failed: {reason}")
            }
            Self::Io { kind, message } => write!(f, "I/O error ({kind:?}): {message}"),
            Self::Protocol { reason } => write!(f, "Protocol error: {reason}"),
            Self::DecodingError { reason } => write!(f, "Decoding error: {reason}"),
            Self::Handshake { address, reason } => {
                write!(f, "TLS handshake with {address} failed: {reason}")
            }
        }
    }
}

impl std::error::Error for ClientError {}

impl ErrorExt for ClientError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ConnectionFailed { .. } => StatusCode::ConnectionFailed,
            Self::ConnectionTimeout { .. } => StatusCode::Timeout,
            Self::ConnectionClosed => StatusCode::ConnectionClosed,
            Self::ServerError { .. } => StatusCode::ServerError,
            Self::UnexpectedResponse { .. } => StatusCode::ProtocolError,
            Self::AuthenticationFailed { .. } => StatusCode::InvalidCredentials,
            Self::Io { .. } => StatusCode::Io,
            Self::Protocol { .. } => StatusCode::InvalidFrame,
            Self::DecodingError { .. } => StatusCode::InvalidUtf8,
            Self::Handshake { .. } => StatusCode::TlsFailed,
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

// Конверсия из io::Error
impl From<io::Error> for ClientError {
    fn from(err: io::Error) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}
