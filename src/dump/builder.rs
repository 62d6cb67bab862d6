//! Построение команд записи для одного ключа.
//!
//! Чистые функции превращают уже прочитанное значение в команды
//! (`SET`, `RPUSH`, `SADD`, `HSET`, `ZADD`, `EXPIREAT`); `fetch_commands`
//! выполняет нужные запросы к серверу и вызывает их. Ключи и значения
//! переносятся как байты: сервер не обязан хранить UTF-8.

use bytes::Bytes;
use kvdump_error::{DumpError, DumpResult};

use super::types::{DumpOptions, ValueType, WriteCommand};
use crate::{client::Executor, network::resp::Reply};

/// Прочитанное значение ключа. Коллекции хранятся в том виде, в котором
/// их вернул сервер (для hash и zset: плоский список пар).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    String(Bytes),
    List(Vec<Bytes>),
    Set(Vec<Bytes>),
    /// `[field, value, field, value, ...]`
    Hash(Vec<Bytes>),
    /// `[member, score, member, score, ...]`
    SortedSet(Vec<Bytes>),
    None,
}

/// Команды, восстанавливающие значение (без TTL).
pub fn value_commands(
    key: &[u8],
    value: &Value,
    batch_size: usize,
) -> Vec<WriteCommand> {
    match value {
        Value::String(v) => vec![string_command(key, v)],
        Value::List(items) => list_commands(key, items, batch_size),
        Value::Set(members) => set_commands(key, members, batch_size),
        Value::Hash(pairs) => hash_commands(key, pairs, batch_size),
        Value::SortedSet(pairs) => zset_commands(key, pairs, batch_size),
        Value::None => Vec::new(),
    }
}

pub fn string_command(
    key: &[u8],
    value: &[u8],
) -> WriteCommand {
    vec![
        Bytes::from_static(b"SET"),
        Bytes::copy_from_slice(key),
        Bytes::copy_from_slice(value),
    ]
}

pub fn list_commands(
    key: &[u8],
    items: &[Bytes],
    batch_size: usize,
) -> Vec<WriteCommand> {
    items
        .chunks(batch_size.max(1))
        .map(|chunk| command_with("RPUSH", key, chunk.iter()))
        .collect()
}

pub fn set_commands(
    key: &[u8],
    members: &[Bytes],
    batch_size: usize,
) -> Vec<WriteCommand> {
    members
        .chunks(batch_size.max(1))
        .map(|chunk| command_with("SADD", key, chunk.iter()))
        .collect()
}

/// `HSET key field value ...`, не более `batch_size` пар в команде.
pub fn hash_commands(
    key: &[u8],
    pairs: &[Bytes],
    batch_size: usize,
) -> Vec<WriteCommand> {
    let pairs: Vec<&[Bytes]> = pairs.chunks_exact(2).collect();
    pairs
        .chunks(batch_size.max(1))
        .map(|chunk| command_with("HSET", key, chunk.iter().flat_map(|p| p.iter())))
        .collect()
}

/// `ZADD key score member ...`; на входе пары (member, score).
pub fn zset_commands(
    key: &[u8],
    pairs: &[Bytes],
    batch_size: usize,
) -> Vec<WriteCommand> {
    let pairs: Vec<&[Bytes]> = pairs.chunks_exact(2).collect();
    pairs
        .chunks(batch_size.max(1))
        .map(|chunk| command_with("ZADD", key, chunk.iter().flat_map(|p| [&p[1], &p[0]])))
        .collect()
}

/// `EXPIREAT key now+ttl`, если у ключа есть положительный TTL.
pub fn ttl_command(
    key: &[u8],
    ttl: i64,
    now: i64,
) -> Option<WriteCommand> {
    (ttl > 0).then(|| {
        vec![
            Bytes::from_static(b"EXPIREAT"),
            Bytes::copy_from_slice(key),
            Bytes::from((now + ttl).to_string()),
        ]
    })
}

fn command_with<'a>(
    name: &'static str,
    key: &[u8],
    args: impl Iterator<Item = &'a Bytes>,
) -> WriteCommand {
    let mut cmd = vec![Bytes::from_static(name.as_bytes()), Bytes::copy_from_slice(key)];
    cmd.extend(args.cloned());
    cmd
}

////////////////////////////////////////////////////////////////////////////////
// Чтение значения с сервера
////////////////////////////////////////////////////////////////////////////////

/// `NAME key [rest...]`
fn key_command(
    name: &'static str,
    key: &[u8],
    rest: &[&'static str],
) -> Vec<Bytes> {
    let mut args = Vec::with_capacity(2 + rest.len());
    args.push(Bytes::from_static(name.as_bytes()));
    args.push(Bytes::copy_from_slice(key));
    args.extend(rest.iter().map(|arg| Bytes::from_static(arg.as_bytes())));
    args
}

/// Читает тип и значение ключа.
pub async fn fetch_value<E: Executor + ?Sized>(
    executor: &E,
    key: &[u8],
) -> DumpResult<Value> {
    let type_name = executor.execute(&key_command("TYPE", key, &[])).await?.into_string("TYPE")?;

    let value = match ValueType::parse(&type_name) {
        ValueType::String => match executor.execute(&key_command("GET", key, &[])).await? {
            Reply::Bulk(None) => Value::None,
            reply => Value::String(reply.into_bytes("GET")?),
        },
        ValueType::List => Value::List(
            executor
                .execute(&key_command("LRANGE", key, &["0", "-1"]))
                .await?
                .into_bytes_vec("LRANGE")?,
        ),
        ValueType::Set => Value::Set(
            executor
                .execute(&key_command("SMEMBERS", key, &[]))
                .await?
                .into_bytes_vec("SMEMBERS")?,
        ),
        ValueType::Hash => Value::Hash(
            executor
                .execute(&key_command("HGETALL", key, &[]))
                .await?
                .into_bytes_vec("HGETALL")?,
        ),
        ValueType::SortedSet => Value::SortedSet(
            executor
                .execute(&key_command("ZRANGEBYSCORE", key, &["-inf", "+inf", "WITHSCORES"]))
                .await?
                .into_bytes_vec("ZRANGEBYSCORE")?,
        ),
        ValueType::None => Value::None,
        ValueType::Unknown(type_name) => {
            return Err(DumpError::UnknownValueType {
                key: String::from_utf8_lossy(key).into_owned(),
                type_name,
            }
            .into())
        }
    };
    Ok(value)
}

/// Все команды для одного ключа: сначала значение, затем `EXPIREAT`.
///
/// `now`: текущее unix-время в секундах; восстановленный срок жизни
/// отсчитывается от момента дампа.
pub async fn fetch_commands<E: Executor + ?Sized>(
    executor: &E,
    key: &[u8],
    opts: &DumpOptions,
    now: i64,
) -> DumpResult<Vec<WriteCommand>> {
    let value = fetch_value(executor, key).await?;
    if value == Value::None {
        return Ok(Vec::new());
    }

    let mut commands = value_commands(key, &value, opts.batch_size);
    if opts.with_ttl && !commands.is_empty() {
        let ttl = executor.execute(&key_command("TTL", key, &[])).await?.into_integer("TTL")?;
        commands.extend(ttl_command(key, ttl, now));
    }
    Ok(commands)
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
