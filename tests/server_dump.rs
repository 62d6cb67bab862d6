mod common;

use std::{fs::File, io::BufReader, net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::{anyhow, Result};
use bytes::BytesMut;
use common::{args, encode_reply, lines, strings, Entry, MemoryKeyspace};
use kvdump::{
    network::resp::decode_reply, ConnectionConfig, ConnectionFactory, DbTarget, DumpOptions, Dumper,
    Executor, OutputFormat, OutputSink, ProgressNotification, Reply, TlsOptions, WriterSink,
};
use kvdump_error::StatusCode;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::TcpListener,
    sync::mpsc,
};
use tokio_rustls::TlsAcceptor;

/// Поднимает RESP-сервер поверх `MemoryKeyspace` на свободном порту.
async fn start_server(
    keyspace: Arc<MemoryKeyspace>,
    password: Option<&str>,
) -> Result<SocketAddr> {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
    let addr = listener.local_addr()?;
    let password = password.map(str::to_string);

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(serve(socket, keyspace.clone(), password.clone()));
        }
    });
    Ok(addr)
}

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

/// Поднимает RESP-сервер за TLS с сертификатом из `tests/fixtures`
/// (CN=localhost, SAN localhost и 127.0.0.1, подписан `ca.pem`).
async fn start_tls_server(keyspace: Arc<MemoryKeyspace>) -> Result<SocketAddr> {
    let certs = rustls_pemfile::certs(&mut BufReader::new(File::open(fixture("server.pem"))?))
        .collect::<Result<Vec<_>, _>>()?;
    let key = rustls_pemfile::private_key(&mut BufReader::new(File::open(fixture("server.key"))?))?
        .ok_or_else(|| anyhow!("no private key in server.key"))?;

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = rustls::ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .with_no_client_auth()
        .with_single_cert(certs, key)?;
    let acceptor = TlsAcceptor::from(Arc::new(config));

    let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let acceptor = acceptor.clone();
            let keyspace = keyspace.clone();
            tokio::spawn(async move {
                if let Ok(stream) = acceptor.accept(socket).await {
                    serve(stream, keyspace, None).await;
                }
            });
        }
    });
    Ok(addr)
}

async fn serve<S>(
    mut socket: S,
    keyspace: Arc<MemoryKeyspace>,
    password: Option<String>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = BytesMut::new();
    let mut db = 0u32;
    let mut authenticated = password.is_none();

    loop {
        loop {
            let frame = match decode_reply(&mut buf) {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                // Не RESP (например, TLS ClientHello): закрываем соединение
                Err(_) => return,
            };
            let Reply::Array(Some(items)) = frame else {
                return;
            };
            let args: Vec<String> = items
                .into_iter()
                .filter_map(|item| item.into_string("command").ok())
                .collect();

            let reply = keyspace.handle(db, &args);
            let reply = match args[0].to_ascii_uppercase().as_str() {
                "AUTH" => {
                    if password.as_deref() == args.last().map(String::as_str) {
                        authenticated = true;
                        reply
                    } else {
                        Reply::Error("WRONGPASS invalid username-password pair".into())
                    }
                }
                _ if !authenticated => Reply::Error("NOAUTH Authentication required.".into()),
                "SELECT" => match args.get(1).and_then(|d| d.parse().ok()) {
                    Some(index) => {
                        db = index;
                        reply
                    }
                    None => Reply::Error("ERR invalid DB index".into()),
                },
                _ => reply,
            };

            let mut out = BytesMut::new();
            encode_reply(&reply, &mut out);
            if socket.write_all(&out).await.is_err() {
                return;
            }
        }

        match socket.read_buf(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
    }
}

fn config(addr: SocketAddr) -> ConnectionConfig {
    ConnectionConfig {
        pool_size: 3,
        ..ConnectionConfig::new("127.0.0.1", addr.port())
    }
}

fn options() -> DumpOptions {
    DumpOptions {
        output: OutputFormat::Commands,
        with_ttl: false,
        workers: 3,
        batch_size: 2,
        ..Default::default()
    }
}

#[tokio::test]
async fn pool_executes_commands_over_tcp() -> Result<()> {
    let ks = MemoryKeyspace::new();
    ks.insert(1, "greeting", Entry::String("héllo wörld".into()));
    let addr = start_server(ks.clone(), None).await?;

    let factory = ConnectionFactory::new(config(addr))?;
    let pool = factory.pool(Some(1)).await?;
    let reply = pool.execute(&args(&["GET", "greeting"])).await?;
    assert_eq!(reply.into_string("GET")?, "héllo wörld");

    let err = pool.execute(&args(&["BOGUS"])).await.unwrap_err();
    assert_eq!(err.status_code(), StatusCode::ServerError);
    // Ошибка сервера не ломает соединение
    assert_eq!(pool.idle_count(), 1);
    assert!(ks.commands().contains(&strings(&["SELECT", "1"])));
    Ok(())
}

/// Тест проверяет полный дамп всех баз с ACL-аутентификацией.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dump_all_databases_with_auth() -> Result<()> {
    let ks = MemoryKeyspace::new();
    ks.insert(0, "s1", Entry::String("hello".into()));
    ks.insert(3, "myset", Entry::Set(strings(&["1", "2", "3"])));
    ks.insert(5, "h", Entry::Hash(vec![("f".into(), "v".into())]));
    let addr = start_server(ks.clone(), Some("secret")).await?;

    let factory = ConnectionFactory::new(ConnectionConfig {
        username: Some("admin".into()),
        password: Some("secret".into()),
        ..config(addr)
    })?;
    let sink = Arc::new(WriterSink::new(Vec::new()));
    let (progress_tx, mut progress_rx) = mpsc::channel(64);

    let dumper = Dumper::new(factory, options(), sink.clone()).with_progress(progress_tx);
    let report = dumper.dump(DbTarget::All).await?;
    drop(dumper);

    let dbs: Vec<u32> = report.databases.iter().map(|d| d.db).collect();
    assert_eq!(dbs, vec![0, 3, 5]);
    assert_eq!(report.total_keys(), 3);
    assert_eq!(report.total_errors(), 0);

    let out = lines(&sink.contents());
    assert_eq!(&out[..2], &strings(&["SELECT 0", "SET s1 hello"])[..]);
    assert_eq!(out[2], "SELECT 3");
    assert!(out[3].starts_with("SADD myset ") && out[4].starts_with("SADD myset "));
    assert_eq!(&out[5..], &strings(&["SELECT 5", "HSET h f v"])[..]);

    let commands = ks.commands();
    assert!(commands.contains(&strings(&["AUTH", "admin", "secret"])));
    assert!(commands.contains(&strings(&["INFO", "keyspace"])));

    let mut notes = Vec::new();
    while let Some(note) = progress_rx.recv().await {
        notes.push(note);
    }
    assert_eq!(notes.last(), Some(&ProgressNotification { db: 5, done: 1 }));
    Ok(())
}

#[tokio::test]
async fn dump_single_database_in_resp() -> Result<()> {
    let ks = MemoryKeyspace::new();
    ks.insert(0, "other", Entry::String("x".into()));
    ks.insert_with_ttl(7, "k", Entry::String("v".into()), 100);
    let addr = start_server(ks, None).await?;

    let sink = Arc::new(WriterSink::new(Vec::new()));
    let opts = DumpOptions {
        output: OutputFormat::Resp,
        with_ttl: true,
        ..options()
    };
    let dumper = Dumper::new(ConnectionFactory::new(config(addr))?, opts, sink.clone());
    let report = dumper.dump(DbTarget::Single(7)).await?;
    sink.flush()?;

    assert_eq!(report.databases.len(), 1);
    let out = sink.contents();
    assert!(out.starts_with(
        "*2\r\n$6\r\nSELECT\r\n$1\r\n7\r\n*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$1\r\nv\r\n*3\r\n$8\r\nEXPIREAT\r\n$1\r\nk\r\n"
    ));
    assert!(!out.contains("other"));
    Ok(())
}

#[tokio::test]
async fn wrong_password_is_fatal() -> Result<()> {
    let addr = start_server(MemoryKeyspace::new(), Some("secret")).await?;

    let factory = ConnectionFactory::new(ConnectionConfig {
        password: Some("guess".into()),
        ..config(addr)
    })?;
    let dumper = Dumper::new(factory, options(), Arc::new(WriterSink::new(Vec::new())));
    let err = dumper.dump(DbTarget::All).await.unwrap_err();
    assert_eq!(err.status_code(), StatusCode::InvalidCredentials);
    assert!(err.to_string().contains("WRONGPASS"));
    Ok(())
}

#[tokio::test]
async fn missing_auth_surfaces_server_error() -> Result<()> {
    let addr = start_server(MemoryKeyspace::new(), Some("secret")).await?;

    let dumper = Dumper::new(
        ConnectionFactory::new(config(addr))?,
        options(),
        Arc::new(WriterSink::new(Vec::new())),
    );
    let err = dumper.dump(DbTarget::All).await.unwrap_err();
    assert_eq!(err.status_code(), StatusCode::ServerError);
    assert!(err.to_string().contains("NOAUTH"));
    Ok(())
}

/// Тест проверяет, что TLS к серверу без TLS падает на рукопожатии.
#[tokio::test]
async fn tls_handshake_failure_is_reported() -> Result<()> {
    let addr = start_server(MemoryKeyspace::new(), None).await?;

    let factory = ConnectionFactory::new(ConnectionConfig {
        tls: Some(TlsOptions {
            insecure: true,
            ..Default::default()
        }),
        ..config(addr)
    })?;
    let err = factory.pool(None).await.err().unwrap();
    assert_eq!(err.status_code(), StatusCode::TlsFailed);
    Ok(())
}

/// Тест проверяет дамп через TLS с проверкой сертификата сервера по CA.
#[tokio::test]
async fn dump_over_verified_tls() -> Result<()> {
    let ks = MemoryKeyspace::new();
    ks.insert(0, "s1", Entry::String("hello".into()));
    ks.insert(0, "l", Entry::List(strings(&["a", "b"])));
    let addr = start_tls_server(ks.clone()).await?;

    let factory = ConnectionFactory::new(ConnectionConfig {
        tls: Some(TlsOptions {
            ca_cert: Some(fixture("ca.pem")),
            ..Default::default()
        }),
        ..config(addr)
    })?;
    let sink = Arc::new(WriterSink::new(Vec::new()));
    let report = Dumper::new(factory, options(), sink.clone()).dump(DbTarget::Single(0)).await?;

    assert_eq!(report.total_keys(), 2);
    assert_eq!(report.total_errors(), 0);
    let mut out = lines(&sink.contents());
    out.sort();
    assert_eq!(out, strings(&["RPUSH l a b", "SELECT 0", "SET s1 hello"]));
    Ok(())
}

/// Тест проверяет, что без CA-издателя сертификат сервера отклоняется,
/// а с `insecure` рукопожатие проходит.
#[tokio::test]
async fn tls_trust_settings() -> Result<()> {
    let ks = MemoryKeyspace::new();
    ks.insert(0, "k", Entry::String("v".into()));
    let addr = start_tls_server(ks).await?;

    // Доверен только сам лист: издатель неизвестен
    let untrusted = ConnectionFactory::new(ConnectionConfig {
        tls: Some(TlsOptions {
            ca_cert: Some(fixture("server.pem")),
            ..Default::default()
        }),
        ..config(addr)
    })?;
    let err = untrusted.pool(None).await.err().unwrap();
    assert_eq!(err.status_code(), StatusCode::TlsFailed);

    let insecure = ConnectionFactory::new(ConnectionConfig {
        tls: Some(TlsOptions {
            insecure: true,
            ..Default::default()
        }),
        ..config(addr)
    })?;
    let pool = insecure.pool(Some(0)).await?;
    let reply = pool.execute(&args(&["GET", "k"])).await?;
    assert_eq!(reply.into_string("GET")?, "v");
    Ok(())
}
