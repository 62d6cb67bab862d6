/// Немедленно возвращает ошибку (аналогично `anyhow::bail!`).
///
/// Макрос возвращает `Err(StackError)` из текущей функции. Поддерживает три
/// формы:
/// - `bail!(err)`: принимает уже готовый тип ошибки или
///   `StackError`-совместимый тип;
/// - `bail!(code, "msg")`: создаёт `GenericError` с кодом и сообщением;
/// - `bail!(code, "fmt {}", arg)`: форматирует сообщение.
///
/// Пример:
///
/// ```ignore
/// use kvdump_error::{bail, StatusCode};
///
/// fn validate_workers(workers: usize) -> Result<(), crate::StackError> {
///     if workers == 0 {
///         bail!(StatusCode::InvalidConfig, "At least one worker is required");
///     }
///     if workers > 4096 {
///         bail!(StatusCode::InvalidConfig, "Too many workers: {}", workers);
///     }
///     Ok(())
/// }
/// ```
#[macro_export]
macro_rules! bail {
    ($err:expr) => {
        return Err($crate::StackError::from($err))
    };
    ($code:expr, $msg:expr) => {
        return Err($crate::StackError::new(
            $crate::types::GenericError::new($code, $msg)
        ))
    };
    ($code:expr, $fmt:expr, $($arg:tt)*) => {
        return Err($crate::StackError::new(
            $crate::types::GenericError::new($code, format!($fmt, $($arg)*))
        ))
    };
}

/// Проверяет условие и вызывает `bail!`, если условие ложно.
///
/// Формы аналогичны `bail!`:
/// - `ensure!(cond, err)`: если `cond` ложно, выполняется `bail!(err)`.
/// - `ensure!(cond, code, "msg")`: если `cond` ложно, выполняется `bail!(code,
///   "msg")`.
/// - `ensure!(cond, code, "fmt {}", arg)`: форматированная форма.
///
/// Пример:
///
/// ```ignore
/// use kvdump_error::{ensure, StatusCode};
///
/// fn check_port(port: i64) -> Result<(), crate::StackError> {
///     ensure!(port > 0, StatusCode::InvalidConfig, "Port must be positive");
///     ensure!(port <= 65535, StatusCode::InvalidConfig, "Port too large: {}", port);
///     Ok(())
/// }
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !($cond) {
            $crate::bail!($err);
        }
    };
    ($cond:expr, $code:expr, $msg:expr) => {
        if !($cond) {
            $crate::bail!($code, $msg);
        }
    };
    ($cond:expr, $code:expr, $fmt:expr, $($arg:tt)*) => {
        if !($cond) {
            $crate::bail!($code, $fmt, $($arg)*);
        }
    };
}

/// Трейт-расширение для `Result`, добавляющее удобные методы контекстирования.
///
/// Позволяет вызывать `.context(...)` и `.with_context(...)` на результатах,
/// превращая ошибку в [`StackError`] и приклеивая к ней контекст.
pub trait ResultExt<T> {
    /// Добавляет контекст к ошибке: для `Err` оборачивает ошибку в
    /// `StackError` и добавляет указанный контекст.
    fn context<C>(
        self,
        ctx: C,
    ) -> Result<T, crate::StackError>
    where
        C: Into<String>;

    /// Добавляет ленивый контекст (вызывается только в случае ошибки).
    ///
    /// Полезно, если формирование строки контекста дорогостоящее.
    fn with_context<C, F>(
        self,
        f: F,
    ) -> Result<T, crate::StackError>
    where
        C: Into<String>,
        F: FnOnce() -> C;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<crate::StackError>,
{
    #[track_caller]
    fn context<C>(
        self,
        ctx: C,
    ) -> Result<T, crate::StackError>
    where
        C: Into<String>,
    {
        self.map_err(|e| e.into().context(ctx))
    }

    #[track_caller]
    fn with_context<C, F>(
        self,
        f: F,
    ) -> Result<T, crate::StackError>
    where
        C: Into<String>,
        F: FnOnce() -> C,
    {
        self.map_err(|e| e.into().context(f()))
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClientError, DumpResult, GenericError, StatusCode};

    fn check_workers(workers: usize) -> DumpResult<usize> {
        ensure!(workers > 0, StatusCode::InvalidConfig, "workers must be positive");
        ensure!(workers <= 4096, StatusCode::InvalidConfig, "too many workers: {}", workers);
        Ok(workers)
    }

    #[test]
    fn test_ensure_keeps_code_and_message() {
        assert_eq!(check_workers(10).unwrap(), 10);

        let err = check_workers(0).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::InvalidConfig);
        assert_eq!(err.to_string(), "workers must be positive");

        let err = check_workers(5000).unwrap_err();
        assert_eq!(err.to_string(), "too many workers: 5000");
    }

    /// Тест проверяет, что `bail!` принимает готовую доменную ошибку.
    #[test]
    fn test_bail_with_domain_error() {
        fn read() -> DumpResult<()> {
            bail!(ClientError::ConnectionClosed);
        }

        let err = read().unwrap_err();
        assert_eq!(err.status_code(), StatusCode::ConnectionClosed);
        assert!(err.downcast_ref::<ClientError>().is_some());
    }

    #[test]
    fn test_context_chain_is_prefixed() {
        fn scan() -> Result<(), GenericError> {
            Err(GenericError::new(StatusCode::Io, "connection reset"))
        }

        fn dump_db() -> DumpResult<()> {
            scan().context("SCAN 0")?;
            Ok(())
        }

        let err = dump_db().context("db 3").unwrap_err();
        let messages: Vec<&str> = err.contexts().iter().map(|c| c.message.as_str()).collect();
        assert_eq!(messages, vec!["SCAN 0", "db 3"]);
        assert!(err.to_string().contains("connection reset"));
    }

    /// Тест проверяет, что контекст `with_context` строится только для `Err`.
    #[test]
    fn test_with_context_is_lazy() {
        let mut built = 0;
        let ok: Result<u32, GenericError> = Ok(7);
        assert_eq!(
            ok.with_context(|| {
                built += 1;
                "never"
            })
            .unwrap(),
            7
        );
        assert_eq!(built, 0);

        let failed: Result<u32, GenericError> =
            Err(GenericError::new(StatusCode::Internal, "boom"));
        assert!(failed.with_context(|| format!("SELECT {}", 2)).is_err());
    }
}
