use std::io::Cursor;

use bytes::{Buf, Bytes, BytesMut};
use kvdump_error::{ClientError, DumpResult as ClientResult};

use super::frame::Reply;

/// Maximum BulkString size (512mb).
pub const MAX_BULK_LENGTH: usize = 512 * 1024 * 1024;
/// Maximum nesting of arrays (32 levels).
pub const MAX_ARRAY_DEPTH: usize = 32;

/// Результат промежуточного разбора.
enum Partial {
    /// Данных в буфере пока недостаточно.
    Incomplete,
    /// Поток нарушает протокол.
    Invalid(String),
}

type PartialResult<T> = Result<T, Partial>;

/// Пытается декодировать один ответ RESP2 из начала буфера.
///
/// Возвращает `Ok(Some(reply))` и отрезает потреблённые байты, если фрейм
/// полный; `Ok(None)`, если нужно дочитать данные; ошибку протокола, если
/// поток повреждён.
pub fn decode_reply(buf: &mut BytesMut) -> ClientResult<Option<Reply>> {
    if buf.is_empty() {
        return Ok(None);
    }

    let mut cursor = Cursor::new(&buf[..]);
    match check_complete(&mut cursor, 0) {
        Ok(()) => {}
        Err(Partial::Incomplete) => return Ok(None),
        Err(Partial::Invalid(reason)) => return Err(ClientError::Protocol { reason }.into()),
    }

    let len = cursor.position() as usize;
    cursor.set_position(0);
    let reply = parse_reply(&mut cursor).map_err(|p| match p {
        Partial::Incomplete => ClientError::Protocol {
            reason: "frame shrank between check and parse".to_string(),
        },
        Partial::Invalid(reason) => ClientError::Protocol { reason },
    })?;
    buf.advance(len);
    Ok(Some(reply))
}

/// Проверяет, что в буфере лежит полный фрейм, и сдвигает курсор за него.
fn check_complete(
    cursor: &mut Cursor<&[u8]>,
    depth: usize,
) -> PartialResult<()> {
    if depth > MAX_ARRAY_DEPTH {
        return Err(Partial::Invalid(format!(
            "array nesting exceeds {MAX_ARRAY_DEPTH} levels"
        )));
    }

    match get_byte(cursor)? {
        b'+' | b'-' | b':' => read_line(cursor).map(|_| ()),
        b'$' => {
            let len = read_decimal(cursor)?;
            if len == -1 {
                return Ok(());
            }
            let len = checked_len(len, "bulk string")?;
            if len > MAX_BULK_LENGTH {
                return Err(Partial::Invalid(format!(
                    "bulk string of {len} bytes exceeds limit"
                )));
            }
            read_bytes(cursor, len)?;
            skip_crlf(cursor)
        }
        b'*' => {
            let count = read_decimal(cursor)?;
            if count == -1 {
                return Ok(());
            }
            for _ in 0..checked_len(count, "array")? {
                check_complete(cursor, depth + 1)?;
            }
            Ok(())
        }
        byte => Err(Partial::Invalid(format!("unexpected type byte 0x{byte:02x}"))),
    }
}

/// Разбирает фрейм, полнота которого уже проверена.
fn parse_reply(cursor: &mut Cursor<&[u8]>) -> PartialResult<Reply> {
    match get_byte(cursor)? {
        b'+' => Ok(Reply::Status(line_to_string(read_line(cursor)?)?)),
        b'-' => Ok(Reply::Error(line_to_string(read_line(cursor)?)?)),
        b':' => Ok(Reply::Integer(read_decimal(cursor)?)),
        b'$' => {
            let len = read_decimal(cursor)?;
            if len == -1 {
                return Ok(Reply::Bulk(None));
            }
            let data = Bytes::copy_from_slice(read_bytes(cursor, checked_len(len, "bulk string")?)?);
            skip_crlf(cursor)?;
            Ok(Reply::Bulk(Some(data)))
        }
        b'*' => {
            let count = read_decimal(cursor)?;
            if count == -1 {
                return Ok(Reply::Array(None));
            }
            let count = checked_len(count, "array")?;
            let mut items = Vec::with_capacity(count.min(1024));
            for _ in 0..count {
                items.push(parse_reply(cursor)?);
            }
            Ok(Reply::Array(Some(items)))
        }
        byte => Err(Partial::Invalid(format!("unexpected type byte 0x{byte:02x}"))),
    }
}

////////////////////////////////////////////////////////////////////////////////
// Низкоуровневые функции курсора
////////////////////////////////////////////////////////////////////////////////

fn checked_len(
    n: i64,
    what: &str,
) -> PartialResult<usize> {
    usize::try_from(n).map_err(|_| Partial::Invalid(format!("negative {what} length {n}")))
}

fn get_byte(cursor: &mut Cursor<&[u8]>) -> PartialResult<u8> {
    if !cursor.has_remaining() {
        return Err(Partial::Incomplete);
    }
    Ok(cursor.get_u8())
}

fn read_line<'a>(cursor: &mut Cursor<&'a [u8]>) -> PartialResult<&'a [u8]> {
    let start = cursor.position() as usize;
    let buf: &'a [u8] = cursor.get_ref();
    let end = buf[start..]
        .windows(2)
        .position(|w| w == b"\r\n")
        .ok_or(Partial::Incomplete)?;
    cursor.set_position((start + end + 2) as u64);
    Ok(&buf[start..start + end])
}

fn line_to_string(line: &[u8]) -> PartialResult<String> {
    String::from_utf8(line.to_vec())
        .map_err(|e| Partial::Invalid(format!("invalid UTF-8 in simple string: {e}")))
}

fn read_decimal(cursor: &mut Cursor<&[u8]>) -> PartialResult<i64> {
    let line = read_line(cursor)?;
    let s = std::str::from_utf8(line)
        .map_err(|_| Partial::Invalid("invalid UTF-8 in integer".to_string()))?;
    s.parse::<i64>()
        .map_err(|_| Partial::Invalid(format!("invalid integer '{s}'")))
}

fn read_bytes<'a>(
    cursor: &mut Cursor<&'a [u8]>,
    n: usize,
) -> PartialResult<&'a [u8]> {
    let start = cursor.position() as usize;
    let buf: &'a [u8] = cursor.get_ref();
    if buf.len() - start < n {
        return Err(Partial::Incomplete);
    }
    cursor.set_position((start + n) as u64);
    Ok(&buf[start..start + n])
}

fn skip_crlf(cursor: &mut Cursor<&[u8]>) -> PartialResult<()> {
    match read_bytes(cursor, 2)? {
        b"\r\n" => Ok(()),
        _ => Err(Partial::Invalid("expected CRLF after bulk string".to_string())),
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
