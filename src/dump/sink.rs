use std::io::Write;

use kvdump_error::DumpResult;

/// Приёмник строк дампа.
///
/// В него одновременно пишут все воркеры, поэтому реализация обязана
/// сериализовать запись одной строки целиком.
pub trait OutputSink: Send + Sync {
    /// Записывает одну строку. Перевод строки добавляется, если строка
    /// им не заканчивается (фреймы RESP уже заканчиваются на `\r\n`).
    fn write_line(
        &self,
        line: &[u8],
    ) -> DumpResult<()>;

    fn flush(&self) -> DumpResult<()>;
}

/// Приёмник поверх любого `Write` (stdout, файл, `Vec<u8>` в тестах).
pub struct WriterSink<W> {
    inner: parking_lot::Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            inner: parking_lot::Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.inner.into_inner()
    }
}

impl WriterSink<Vec<u8>> {
    /// Копия записанного содержимого как текст (невалидный UTF-8
    /// заменяется на U+FFFD).
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.inner.lock()).into_owned()
    }

    /// Копия записанных байтов.
    pub fn contents_bytes(&self) -> Vec<u8> {
        self.inner.lock().clone()
    }
}

impl<W: Write + Send> OutputSink for WriterSink<W> {
    fn write_line(
        &self,
        line: &[u8],
    ) -> DumpResult<()> {
        let mut writer = self.inner.lock();
        writer.write_all(line)?;
        if !line.ends_with(b"\n") {
            writer.write_all(b"\n")?;
        }
        Ok(())
    }

    fn flush(&self) -> DumpResult<()> {
        self.inner.lock().flush()?;
        Ok(())
    }
}
