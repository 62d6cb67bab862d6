//! Сериализация команд записи.
//!
//! Один и тот же multi-bulk формат используется для запросов клиента к
//! серверу (`encode_command`) и для строк выходного дампа
//! (`serialize_protocol`).

use std::str::FromStr;

use bytes::{BufMut, Bytes, BytesMut};
use kvdump_error::{bail, StackError, StatusCode};

/// Формат строк выходного потока.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Фреймы протокола RESP (`*3\r\n$3\r\nSET\r\n...`).
    #[default]
    Resp,
    /// Командные строки вида `SET key "hello world"`.
    Commands,
}

impl OutputFormat {
    pub fn serialize<A: AsRef<[u8]>>(
        self,
        cmd: &[A],
    ) -> Bytes {
        match self {
            OutputFormat::Resp => serialize_protocol(cmd),
            OutputFormat::Commands => serialize_commandline(cmd),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Resp => "resp",
            OutputFormat::Commands => "commands",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = StackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "resp" => Ok(OutputFormat::Resp),
            "commands" => Ok(OutputFormat::Commands),
            other => bail!(
                StatusCode::InvalidConfig,
                "unknown output format '{}' (expected resp or commands)",
                other
            ),
        }
    }
}

/// Аргументы команды из строк или байтов.
pub fn command_args<I>(parts: I) -> Vec<Bytes>
where
    I: IntoIterator,
    I::Item: AsRef<[u8]>,
{
    parts
        .into_iter()
        .map(|part| Bytes::copy_from_slice(part.as_ref()))
        .collect()
}

/// Кодирует команду в multi-bulk фрейм. Длины считаются в байтах.
pub fn serialize_protocol<A: AsRef<[u8]>>(cmd: &[A]) -> Bytes {
    let mut buf =
        BytesMut::with_capacity(16 + cmd.iter().map(|a| a.as_ref().len() + 16).sum::<usize>());
    encode_command(cmd, &mut buf);
    buf.freeze()
}

/// Склеивает команду через пробел, оборачивая в кавычки пустые элементы и
/// элементы с пробельными символами. Кавычки внутри не экранируются, байты
/// вне UTF-8 пишутся как есть.
pub fn serialize_commandline<A: AsRef<[u8]>>(cmd: &[A]) -> Bytes {
    let mut buf = BytesMut::new();
    for (i, arg) in cmd.iter().enumerate() {
        if i > 0 {
            buf.put_u8(b' ');
        }
        let arg = arg.as_ref();
        if needs_quotes(arg) {
            buf.put_u8(b'"');
            buf.put_slice(arg);
            buf.put_u8(b'"');
        } else {
            buf.put_slice(arg);
        }
    }
    buf.freeze()
}

fn needs_quotes(arg: &[u8]) -> bool {
    if arg.is_empty() {
        return true;
    }
    match std::str::from_utf8(arg) {
        Ok(s) => s.chars().any(char::is_whitespace),
        Err(_) => arg.iter().any(u8::is_ascii_whitespace),
    }
}

/// Записывает запрос клиента в буфер отправки.
pub fn encode_command<A: AsRef<[u8]>>(
    args: &[A],
    buf: &mut BytesMut,
) {
    buf.put_u8(b'*');
    buf.put_slice(args.len().to_string().as_bytes());
    buf.put_slice(b"\r\n");
    for arg in args {
        let arg = arg.as_ref();
        buf.put_u8(b'$');
        buf.put_slice(arg.len().to_string().as_bytes());
        buf.put_slice(b"\r\n");
        buf.put_slice(arg);
        buf.put_slice(b"\r\n");
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
