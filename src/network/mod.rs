//! Сетевой протокол.
//!
//! - `resp`: фреймы RESP2: декодирование ответов сервера и сериализация
//!   команд (запросы клиента и строки дампа).

pub mod resp;

pub use resp::*;
