//! Общие помощники интеграционных тестов: хранилище ключей в памяти,
//! отвечающее на команды так же, как сервер.

#![allow(dead_code)]

use std::{
    collections::{BTreeMap, HashSet},
    sync::Arc,
};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use globset::Glob;
use kvdump::{
    network::resp::{command_args, Reply},
    Executor,
};
use kvdump_error::{ClientError, DumpResult};
use parking_lot::Mutex;

/// Значение ключа в тестовом хранилище.
#[derive(Debug, Clone)]
pub enum Entry {
    String(String),
    List(Vec<String>),
    Set(Vec<String>),
    Hash(Vec<(String, String)>),
    /// (member, score)
    SortedSet(Vec<(String, String)>),
    /// Тип, который дамп воспроизвести не может
    Stream,
}

#[derive(Debug, Clone)]
struct Stored {
    entry: Entry,
    ttl: i64,
}

#[derive(Default)]
pub struct MemoryKeyspace {
    dbs: Mutex<BTreeMap<u32, BTreeMap<String, Stored>>>,
    failing: Mutex<HashSet<String>>,
    log: Mutex<Vec<Vec<String>>>,
}

impl MemoryKeyspace {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert(
        &self,
        db: u32,
        key: &str,
        entry: Entry,
    ) {
        self.insert_with_ttl(db, key, entry, -1);
    }

    pub fn insert_with_ttl(
        &self,
        db: u32,
        key: &str,
        entry: Entry,
        ttl: i64,
    ) {
        self.dbs
            .lock()
            .entry(db)
            .or_default()
            .insert(key.to_string(), Stored { entry, ttl });
    }

    /// `TYPE key` будет отвечать ошибкой сервера.
    pub fn fail_on(
        &self,
        key: &str,
    ) {
        self.failing.lock().insert(key.to_string());
    }

    /// Все выполненные команды.
    pub fn commands(&self) -> Vec<Vec<String>> {
        self.log.lock().clone()
    }

    pub fn executor(
        self: &Arc<Self>,
        db: u32,
    ) -> DbExecutor {
        DbExecutor {
            keyspace: self.clone(),
            db,
        }
    }

    /// Отвечает на команду в базе `db`.
    pub fn handle(
        &self,
        db: u32,
        args: &[String],
    ) -> Reply {
        self.log.lock().push(args.to_vec());
        let Some(name) = args.first() else {
            return Reply::Error("ERR empty command".into());
        };
        let arg = |i: usize| args.get(i).cloned().unwrap_or_default();

        let dbs = self.dbs.lock();
        let empty = BTreeMap::new();
        let keys = dbs.get(&db).unwrap_or(&empty);

        match name.to_ascii_uppercase().as_str() {
            "PING" => Reply::Status("PONG".into()),
            "SELECT" | "AUTH" => Reply::Status("OK".into()),
            "TYPE" => {
                if self.failing.lock().contains(&arg(1)) {
                    return Reply::Error("ERR injected failure".into());
                }
                let name = match keys.get(&arg(1)).map(|s| &s.entry) {
                    None => "none",
                    Some(Entry::String(_)) => "string",
                    Some(Entry::List(_)) => "list",
                    Some(Entry::Set(_)) => "set",
                    Some(Entry::Hash(_)) => "hash",
                    Some(Entry::SortedSet(_)) => "zset",
                    Some(Entry::Stream) => "stream",
                };
                Reply::Status(name.into())
            }
            "GET" => match keys.get(&arg(1)).map(|s| &s.entry) {
                Some(Entry::String(v)) => Reply::bulk(v.clone()),
                None => Reply::Bulk(None),
                _ => wrongtype(),
            },
            "LRANGE" => match keys.get(&arg(1)).map(|s| &s.entry) {
                Some(Entry::List(items)) => Reply::bulk_array(items.clone()),
                None => Reply::Array(Some(Vec::new())),
                _ => wrongtype(),
            },
            "SMEMBERS" => match keys.get(&arg(1)).map(|s| &s.entry) {
                Some(Entry::Set(items)) => Reply::bulk_array(items.clone()),
                None => Reply::Array(Some(Vec::new())),
                _ => wrongtype(),
            },
            "HGETALL" => match keys.get(&arg(1)).map(|s| &s.entry) {
                Some(Entry::Hash(pairs)) => {
                    Reply::bulk_array(pairs.iter().flat_map(|(f, v)| [f.clone(), v.clone()]))
                }
                None => Reply::Array(Some(Vec::new())),
                _ => wrongtype(),
            },
            "ZRANGEBYSCORE" => match keys.get(&arg(1)).map(|s| &s.entry) {
                Some(Entry::SortedSet(pairs)) => {
                    Reply::bulk_array(pairs.iter().flat_map(|(m, s)| [m.clone(), s.clone()]))
                }
                None => Reply::Array(Some(Vec::new())),
                _ => wrongtype(),
            },
            "TTL" => Reply::Integer(keys.get(&arg(1)).map_or(-2, |s| s.ttl)),
            "KEYS" => Reply::bulk_array(matching(keys, &arg(1))),
            "SCAN" => {
                let cursor: usize = arg(1).parse().unwrap_or(0);
                let pattern = option(args, "MATCH").unwrap_or_else(|| "*".to_string());
                let count: usize = option(args, "COUNT").and_then(|c| c.parse().ok()).unwrap_or(10);

                let all: Vec<&String> = keys.keys().collect();
                let end = (cursor + count).min(all.len());
                let page: Vec<String> = matching_iter(all[cursor.min(end)..end].iter().copied(), &pattern);
                let next = if end >= all.len() { 0 } else { end };
                Reply::Array(Some(vec![Reply::bulk(next.to_string()), Reply::bulk_array(page)]))
            }
            "INFO" => {
                let mut info = String::from("# Keyspace\r\n");
                for (db, keys) in dbs.iter().filter(|(_, k)| !k.is_empty()) {
                    info.push_str(&format!("db{db}:keys={},expires=0,avg_ttl=0\r\n", keys.len()));
                }
                Reply::bulk(info)
            }
            other => Reply::Error(format!("ERR unknown command '{other}'")),
        }
    }
}

fn wrongtype() -> Reply {
    Reply::Error("WRONGTYPE Operation against a key holding the wrong kind of value".into())
}

fn option(
    args: &[String],
    name: &str,
) -> Option<String> {
    args.iter()
        .position(|a| a.eq_ignore_ascii_case(name))
        .and_then(|i| args.get(i + 1).cloned())
}

fn matching(
    keys: &BTreeMap<String, Stored>,
    pattern: &str,
) -> Vec<String> {
    matching_iter(keys.keys(), pattern)
}

fn matching_iter<'a>(
    keys: impl Iterator<Item = &'a String>,
    pattern: &str,
) -> Vec<String> {
    let matcher = Glob::new(pattern).unwrap().compile_matcher();
    keys.filter(|k| matcher.is_match(k.as_str())).cloned().collect()
}

/// Исполнитель, привязанный к одной базе хранилища.
#[derive(Clone)]
pub struct DbExecutor {
    keyspace: Arc<MemoryKeyspace>,
    db: u32,
}

#[async_trait]
impl Executor for DbExecutor {
    async fn execute(
        &self,
        args: &[Bytes],
    ) -> DumpResult<Reply> {
        let args: Vec<String> =
            args.iter().map(|a| String::from_utf8_lossy(a).into_owned()).collect();
        match self.keyspace.handle(self.db, &args) {
            Reply::Error(message) => Err(ClientError::ServerError { message }.into()),
            reply => Ok(reply),
        }
    }
}

/// Кодирует ответ в байты RESP2 (для тестового TCP-сервера).
pub fn encode_reply(
    reply: &Reply,
    out: &mut BytesMut,
) {
    match reply {
        Reply::Status(s) => out.extend_from_slice(format!("+{s}\r\n").as_bytes()),
        Reply::Error(e) => out.extend_from_slice(format!("-{e}\r\n").as_bytes()),
        Reply::Integer(n) => out.extend_from_slice(format!(":{n}\r\n").as_bytes()),
        Reply::Bulk(None) => out.extend_from_slice(b"$-1\r\n"),
        Reply::Bulk(Some(b)) => {
            out.extend_from_slice(format!("${}\r\n", b.len()).as_bytes());
            out.extend_from_slice(b);
            out.extend_from_slice(b"\r\n");
        }
        Reply::Array(None) => out.extend_from_slice(b"*-1\r\n"),
        Reply::Array(Some(items)) => {
            out.extend_from_slice(format!("*{}\r\n", items.len()).as_bytes());
            for item in items {
                encode_reply(item, out);
            }
        }
    }
}

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Аргументы команды для `Executor::execute`.
pub fn args(items: &[&str]) -> Vec<Bytes> {
    command_args(items)
}

/// Строки вывода в формате командной строки.
pub fn lines(output: &str) -> Vec<String> {
    output.lines().map(str::to_string).collect()
}
