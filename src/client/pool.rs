//! Пул соединений.
//!
//! Соединения создаются лениво до `max_size`; число одновременно занятых
//! соединений ограничено семафором. Соединение, на котором произошла
//! ошибка транспорта или протокола, в пул не возвращается.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use kvdump_error::{ClientError, DumpResult as ClientResult, StatusCode};
use tokio::sync::Semaphore;
use tokio_rustls::TlsConnector;
use tracing::{debug, warn};

use super::{ClientConnection, ConnectionConfig, Executor};
use crate::network::resp::Reply;

/// Всё, что нужно для установки нового соединения пула.
#[derive(Clone)]
pub struct Dialer {
    config: Arc<ConnectionConfig>,
    tls: Option<TlsConnector>,
    select_db: Option<u32>,
}

impl Dialer {
    pub fn new(
        config: Arc<ConnectionConfig>,
        tls: Option<TlsConnector>,
        select_db: Option<u32>,
    ) -> Self {
        Self {
            config,
            tls,
            select_db,
        }
    }

    /// Подключается, проходит аутентификацию и выбирает базу.
    pub async fn dial(&self) -> ClientResult<ClientConnection> {
        let cfg = &self.config;
        let mut conn = ClientConnection::connect(
            &cfg.host,
            cfg.port,
            self.tls.as_ref(),
            cfg.connect_timeout,
        )
        .await?;

        if let Some(password) = &cfg.password {
            conn.authenticate(cfg.username.as_deref(), password).await?;
            debug!(address = conn.address(), "Authenticated");
        }
        if let Some(db) = self.select_db {
            conn.select(db).await?;
        }
        Ok(conn)
    }
}

pub struct Pool {
    dialer: Dialer,
    idle: parking_lot::Mutex<Vec<ClientConnection>>,
    semaphore: Semaphore,
    max_size: usize,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl Pool {
    /// Создаёт пул и сразу устанавливает первое соединение, чтобы ошибки
    /// подключения, аутентификации и TLS проявились до начала работы.
    pub async fn connect(
        dialer: Dialer,
        max_size: usize,
    ) -> ClientResult<Self> {
        let max_size = max_size.max(1);
        let first = dialer.dial().await?;
        let mut idle = Vec::with_capacity(max_size);
        idle.push(first);

        Ok(Self {
            dialer,
            idle: parking_lot::Mutex::new(idle),
            semaphore: Semaphore::new(max_size),
            max_size,
        })
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Количество свободных соединений.
    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }

    fn put_back(
        &self,
        conn: ClientConnection,
    ) {
        self.idle.lock().push(conn);
    }
}

#[async_trait]
impl Executor for Pool {
    async fn execute(
        &self,
        args: &[Bytes],
    ) -> ClientResult<Reply> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| ClientError::ConnectionClosed)?;

        let cached = self.idle.lock().pop();
        let mut conn = match cached {
            Some(conn) => conn,
            None => self.dialer.dial().await?,
        };

        match conn.execute(args).await {
            Ok(reply) => {
                self.put_back(conn);
                Ok(reply)
            }
            Err(err) if err.status_code() == StatusCode::ServerError => {
                self.put_back(conn);
                Err(err)
            }
            Err(err) => {
                warn!(address = conn.address(), error = %err, "Discarding broken connection");
                Err(err)
            }
        }
    }
}
