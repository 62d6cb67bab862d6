use kvdump_error::{DumpError, DumpResult, ResultExt};
use tracing::debug;

use crate::{client::Executor, network::resp::command_args};

/// Разбирает секцию `# Keyspace` ответа `INFO keyspace`.
///
/// Строки вида `db<index>:keys=<n>,expires=...`; возвращает отсортированные
/// индексы баз, в которых есть ключи.
pub fn parse_keyspace_info(info: &str) -> DumpResult<Vec<u32>> {
    let mut dbs = Vec::new();

    for line in info.lines().map(str::trim) {
        let Some(rest) = line.strip_prefix("db") else {
            continue;
        };
        let malformed = |reason: String| DumpError::KeyspaceParse {
            line: line.to_string(),
            reason,
        };

        let (index, fields) = rest
            .split_once(':')
            .ok_or_else(|| malformed("missing ':' after database index".to_string()))?;
        let index: u32 = index
            .parse()
            .map_err(|e| malformed(format!("invalid database index '{index}': {e}")))?;

        let empty = fields
            .split(',')
            .filter_map(|field| field.split_once('='))
            .any(|(name, value)| name == "keys" && value == "0");
        if !empty {
            dbs.push(index);
        }
    }

    dbs.sort_unstable();
    dbs.dedup();
    Ok(dbs)
}

/// Выясняет, в каких базах есть данные.
pub async fn discover_databases<E: Executor + ?Sized>(executor: &E) -> DumpResult<Vec<u32>> {
    let info = executor
        .execute(&command_args(["INFO", "keyspace"]))
        .await
        .and_then(|reply| reply.into_string("INFO"))
        .context("INFO keyspace")?;
    let dbs = parse_keyspace_info(&info)?;
    debug!(?dbs, "Discovered databases");
    Ok(dbs)
}
