use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Ошибки подготовки TLS-конфигурации клиента.
#[derive(Debug, Error)]
pub enum TlsError {
    /// TLS запрошен, но не задан ни CA, ни сертификат/ключ, и не разрешён
    /// небезопасный режим.
    #[error("no certificate is set; pass a CA or client certificate, or explicitly allow insecure TLS")]
    NoCertificates,

    /// Только один из пары сертификат/ключ задан
    #[error("client certificate and key must be provided together")]
    IncompleteKeyPair,

    /// Ошибка чтения файла
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Ошибка сертификата
    #[error("certificate error: {0}")]
    Certificate(String),

    /// Ошибка приватного ключа
    #[error("private key error: {0}")]
    PrivateKey(String),

    /// Ошибка сборки конфигурации rustls
    #[error("TLS configuration error: {0}")]
    Config(String),

    /// Некорректное имя сервера для SNI
    #[error("invalid TLS server name '{0}'")]
    ServerName(String),
}

impl ErrorExt for TlsError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NoCertificates | Self::IncompleteKeyPair | Self::ServerName(_) => {
                StatusCode::InvalidConfig
            }
            Self::Io { .. } => StatusCode::Io,
            Self::Certificate(_) | Self::PrivateKey(_) => StatusCode::CertificateError,
            Self::Config(_) => StatusCode::TlsFailed,
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
