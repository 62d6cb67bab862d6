use std::sync::Arc;

use kvdump_error::{ensure, DumpResult as ClientResult, ResultExt, StatusCode};
use tokio_rustls::TlsConnector;
use tracing::debug;

use super::{ConnectionConfig, Dialer, Pool};

/// Фабрика пулов соединений для одного сервера.
///
/// TLS-конфигурация собирается один раз при создании фабрики; каждый
/// пул может быть привязан к своей базе (`SELECT` на каждом новом
/// соединении).
pub struct ConnectionFactory {
    config: Arc<ConnectionConfig>,
    tls: Option<TlsConnector>,
}

impl ConnectionFactory {
    pub fn new(config: ConnectionConfig) -> ClientResult<Self> {
        ensure!(
            config.username.is_none() || config.password.is_some(),
            StatusCode::InvalidConfig,
            "a username requires a password"
        );
        ensure!(
            config.pool_size > 0,
            StatusCode::InvalidConfig,
            "pool size must be positive"
        );

        let tls = config
            .tls
            .as_ref()
            .map(|opts| opts.build_connector())
            .transpose()
            .context("failed to prepare TLS")?;

        Ok(Self {
            config: Arc::new(config),
            tls,
        })
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Открывает пул; `select_db` выбирает базу на каждом новом соединении.
    pub async fn pool(
        &self,
        select_db: Option<u32>,
    ) -> ClientResult<Pool> {
        let address = self.config.address();
        let dialer = Dialer::new(self.config.clone(), self.tls.clone(), select_db);
        let pool = Pool::connect(dialer, self.config.pool_size)
            .await
            .with_context(|| format!("failed to connect to {address}"))?;
        debug!(%address, db = ?select_db, tls = self.tls.is_some(), "Connected");
        Ok(pool)
    }
}
