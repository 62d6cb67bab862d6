use std::time::Duration;

use bytes::{Bytes, BytesMut};
use kvdump_error::{ClientError, DumpResult as ClientResult, ResultExt, StackError};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    time::timeout,
};
use tokio_rustls::{client::TlsStream, TlsConnector};
use tracing::{debug, trace};

use crate::{
    client::tls::server_name,
    network::resp::{command_args, decode_reply, encode_command, Reply},
};

/// Начальный размер буферов чтения и записи (8 КБ).
const BUF_SIZE: usize = 8 * 1024;

/// Транспорт соединения: обычный TCP или TLS поверх TCP.
enum Stream {
    Tcp(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

/// Одно соединение с сервером с буферизованным обменом RESP-фреймами.
pub struct ClientConnection {
    /// Адрес сервера (`host:port`)
    address: String,
    stream: Stream,
    read_buf: BytesMut,
    write_buf: BytesMut,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl ClientConnection {
    /// Устанавливает соединение с `host:port`.
    ///
    /// Таймаут покрывает и TCP-подключение, и TLS-рукопожатие.
    pub async fn connect(
        host: &str,
        port: u16,
        tls: Option<&TlsConnector>,
        connect_timeout: Duration,
    ) -> ClientResult<Self> {
        let address = format!("{host}:{port}");
        debug!("Connecting to {address}");

        let establish = async {
            let tcp = TcpStream::connect(&address).await.map_err(|e| {
                ClientError::ConnectionFailed {
                    address: address.clone(),
                    reason: e.to_string(),
                }
            })?;
            tcp.set_nodelay(true)?;

            let stream = match tls {
                Some(connector) => {
                    let domain = server_name(host)?;
                    let tls_stream = connector.connect(domain, tcp).await.map_err(|e| {
                        ClientError::Handshake {
                            address: address.clone(),
                            reason: e.to_string(),
                        }
                    })?;
                    Stream::Tls(Box::new(tls_stream))
                }
                None => Stream::Tcp(tcp),
            };
            Ok::<_, StackError>(stream)
        };

        let stream = timeout(connect_timeout, establish)
            .await
            .map_err(|_| ClientError::ConnectionTimeout {
                address: address.clone(),
            })??;
        debug!("Connection established with {address}");

        Ok(Self {
            address,
            stream,
            read_buf: BytesMut::with_capacity(BUF_SIZE),
            write_buf: BytesMut::with_capacity(BUF_SIZE),
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// `AUTH password` или `AUTH username password`.
    pub async fn authenticate(
        &mut self,
        username: Option<&str>,
        password: &str,
    ) -> ClientResult<()> {
        let mut args = vec![Bytes::from_static(b"AUTH")];
        if let Some(user) = username {
            args.push(Bytes::copy_from_slice(user.as_bytes()));
        }
        args.push(Bytes::copy_from_slice(password.as_bytes()));

        match self.execute(&args).await {
            Ok(reply) if reply.is_ok() => Ok(()),
            Ok(reply) => Err(ClientError::AuthenticationFailed {
                reason: format!("unexpected reply {reply:?}"),
            }
            .into()),
            Err(err) => match err.downcast_ref::<ClientError>() {
                Some(ClientError::ServerError { message }) => {
                    Err(ClientError::AuthenticationFailed {
                        reason: message.clone(),
                    }
                    .into())
                }
                _ => Err(err),
            },
        }
    }

    /// Переключает соединение на базу `db`.
    pub async fn select(
        &mut self,
        db: u32,
    ) -> ClientResult<()> {
        let reply = self
            .execute(&command_args(["SELECT".to_string(), db.to_string()]))
            .await
            .with_context(|| format!("SELECT {db}"))?;
        if !reply.is_ok() {
            return Err(reply.unexpected("SELECT"));
        }
        Ok(())
    }

    /// Отправляет команду и читает один ответ.
    ///
    /// Ответ-ошибка сервера (`-ERR ...`) превращается в
    /// `ClientError::ServerError`; соединение при этом остаётся пригодным.
    pub async fn execute(
        &mut self,
        args: &[Bytes],
    ) -> ClientResult<Reply> {
        trace!(command = ?args.first(), argc = args.len(), "Sending command");
        self.write_buf.clear();
        encode_command(args, &mut self.write_buf);

        match &mut self.stream {
            Stream::Tcp(tcp) => {
                tcp.write_all(&self.write_buf).await?;
                tcp.flush().await?;
            }
            Stream::Tls(tls) => {
                tls.write_all(&self.write_buf).await?;
                tls.flush().await?;
            }
        }

        match self.read_reply().await? {
            Reply::Error(message) => Err(ClientError::ServerError { message }.into()),
            reply => Ok(reply),
        }
    }

    async fn read_reply(&mut self) -> ClientResult<Reply> {
        loop {
            if let Some(reply) = decode_reply(&mut self.read_buf)? {
                return Ok(reply);
            }

            let n = match &mut self.stream {
                Stream::Tcp(tcp) => tcp.read_buf(&mut self.read_buf).await?,
                Stream::Tls(tls) => tls.read_buf(&mut self.read_buf).await?,
            };

            if n == 0 {
                return Err(ClientError::ConnectionClosed.into());
            }
        }
    }
}
