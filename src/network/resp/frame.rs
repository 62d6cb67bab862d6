use bytes::Bytes;
use kvdump_error::{ClientError, DumpResult as ClientResult};

/// Ответ сервера в формате RESP2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `+OK\r\n`
    Status(String),
    /// `-ERR message\r\n`
    Error(String),
    /// `:42\r\n`
    Integer(i64),
    /// `$5\r\nhello\r\n`; `None` для `$-1\r\n`
    Bulk(Option<Bytes>),
    /// `*N\r\n...`; `None` для `*-1\r\n`
    Array(Option<Vec<Reply>>),
}

impl Reply {
    /// Создаёт bulk-ответ из строки или байтов.
    pub fn bulk(data: impl Into<Bytes>) -> Self {
        Reply::Bulk(Some(data.into()))
    }

    /// Создаёт массив bulk-строк.
    pub fn bulk_array<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Bytes>,
    {
        Reply::Array(Some(items.into_iter().map(Reply::bulk).collect()))
    }

    /// Проверяет, что сервер ответил `+OK`.
    pub fn is_ok(&self) -> bool {
        matches!(self, Reply::Status(s) if s == "OK")
    }

    /// Строковое значение: status или непустой bulk.
    pub fn into_string(
        self,
        command: &str,
    ) -> ClientResult<String> {
        match self {
            Reply::Status(s) => Ok(s),
            Reply::Bulk(Some(bytes)) => bytes_to_string(bytes),
            other => Err(other.unexpected(command)),
        }
    }

    /// Значение как есть, без проверки UTF-8 (ключи, элементы коллекций).
    pub fn into_bytes(
        self,
        command: &str,
    ) -> ClientResult<Bytes> {
        match self {
            Reply::Status(s) => Ok(Bytes::from(s)),
            Reply::Bulk(Some(bytes)) => Ok(bytes),
            other => Err(other.unexpected(command)),
        }
    }

    /// Целочисленное значение (`TTL`, счётчики).
    pub fn into_integer(
        self,
        command: &str,
    ) -> ClientResult<i64> {
        match self {
            Reply::Integer(n) => Ok(n),
            other => Err(other.unexpected(command)),
        }
    }

    /// Массив bulk-строк (`KEYS`, `SMEMBERS`, `LRANGE`, `HGETALL`...).
    ///
    /// Nil-массив считается пустым: ключ мог исчезнуть между `TYPE` и
    /// чтением значения.
    pub fn into_bytes_vec(
        self,
        command: &str,
    ) -> ClientResult<Vec<Bytes>> {
        match self {
            Reply::Array(Some(items)) => items
                .into_iter()
                .map(|item| item.into_bytes(command))
                .collect(),
            Reply::Array(None) => Ok(Vec::new()),
            other => Err(other.unexpected(command)),
        }
    }

    /// Ответ `SCAN`: пара (следующий курсор, ключи).
    pub fn into_scan_page(self) -> ClientResult<(String, Vec<Bytes>)> {
        match self {
            Reply::Array(Some(items)) if items.len() == 2 => {
                let mut items = items.into_iter();
                match (items.next(), items.next()) {
                    (Some(cursor), Some(keys)) => {
                        Ok((cursor.into_string("SCAN")?, keys.into_bytes_vec("SCAN")?))
                    }
                    _ => Err(ClientError::Protocol {
                        reason: "SCAN reply must have two elements".to_string(),
                    }
                    .into()),
                }
            }
            other => Err(other.unexpected("SCAN")),
        }
    }

    /// Ошибка «неожиданный ответ» с кратким описанием содержимого.
    pub fn unexpected(
        &self,
        command: &str,
    ) -> kvdump_error::StackError {
        ClientError::UnexpectedResponse {
            command: command.to_string(),
            reply: self.describe(),
        }
        .into()
    }

    fn describe(&self) -> String {
        match self {
            Reply::Status(s) => format!("status '{s}'"),
            Reply::Error(e) => format!("error '{e}'"),
            Reply::Integer(n) => format!("integer {n}"),
            Reply::Bulk(Some(b)) => format!("bulk string of {} bytes", b.len()),
            Reply::Bulk(None) => "nil bulk string".to_string(),
            Reply::Array(Some(items)) => format!("array of {} elements", items.len()),
            Reply::Array(None) => "nil array".to_string(),
        }
    }
}

fn bytes_to_string(bytes: Bytes) -> ClientResult<String> {
    String::from_utf8(bytes.to_vec()).map_err(|e| {
        ClientError::DecodingError {
            reason: format!("reply is not valid UTF-8: {e}"),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use kvdump_error::StatusCode;

    use super::*;

    #[test]
    fn test_into_string_accepts_status_and_bulk() {
        assert_eq!(Reply::Status("string".into()).into_string("TYPE").unwrap(), "string");
        assert_eq!(Reply::bulk("hello").into_string("GET").unwrap(), "hello");
    }

    #[test]
    fn test_into_string_rejects_integer() {
        let err = Reply::Integer(3).into_string("GET").unwrap_err();
        assert_eq!(err.status_code(), StatusCode::ProtocolError);
        assert!(err.to_string().contains("GET"));
    }

    #[test]
    fn test_nil_array_is_empty_vec() {
        assert!(Reply::Array(None).into_bytes_vec("SMEMBERS").unwrap().is_empty());
    }

    /// Тест проверяет, что элементы массива не обязаны быть UTF-8.
    #[test]
    fn test_bytes_vec_keeps_binary_items() {
        let reply = Reply::bulk_array([Bytes::from_static(b"good"), Bytes::from_static(&[0xff, 0x01])]);
        let items = reply.into_bytes_vec("KEYS").unwrap();
        assert_eq!(items, vec![Bytes::from_static(b"good"), Bytes::from_static(&[0xff, 0x01])]);
    }

    #[test]
    fn test_invalid_utf8_bulk_is_decoding_error() {
        let reply = Reply::Bulk(Some(Bytes::from_static(&[0xff, 0xfe])));
        let err = reply.into_string("GET").unwrap_err();
        assert_eq!(err.status_code(), StatusCode::InvalidUtf8);
    }

    #[test]
    fn test_scan_page() {
        let reply = Reply::Array(Some(vec![
            Reply::bulk("17"),
            Reply::bulk_array(["a", "b"]),
        ]));
        let (cursor, keys) = reply.into_scan_page().unwrap();
        assert_eq!(cursor, "17");
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn test_scan_page_rejects_flat_array() {
        assert!(Reply::bulk_array(["0"]).into_scan_page().is_err());
    }
}
