use std::{fmt, time::Duration};

use super::TlsOptions;

/// Таймаут установки одного соединения (TCP + TLS).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Параметры подключения к серверу.
#[derive(Clone)]
pub struct ConnectionConfig {
    /// Хост сервера
    pub host: String,
    /// Порт сервера
    pub port: u16,
    /// Имя пользователя ACL (требует пароль)
    pub username: Option<String>,
    /// Пароль для `AUTH`
    pub password: Option<String>,
    /// Настройки TLS; `None` означает обычный TCP
    pub tls: Option<TlsOptions>,
    /// Максимальное число соединений в пуле
    pub pool_size: usize,
    /// Таймаут установки соединения
    pub connect_timeout: Duration,
}

impl ConnectionConfig {
    pub fn new(
        host: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Адрес в виде `host:port`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            username: None,
            password: None,
            tls: None,
            pool_size: 10,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

// Пароль не должен попадать в логи.
impl fmt::Debug for ConnectionConfig {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("tls", &self.tls)
            .field("pool_size", &self.pool_size)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}
