//! Модуль `resp` реализует клиентскую часть протокола RESP2.
//!
//! - `frame` – тип ответа сервера [`Reply`] и его преобразования.
//! - `decoder` – потоковый разбор ответов из буфера чтения.
//! - `serializer` – кодирование команд: для отправки на сервер и для
//!   выходного потока дампа (RESP или текстовые команды).

pub mod decoder;
pub mod frame;
pub mod serializer;

// Publicly re-export the protocol types to simplify access from external code.
pub use decoder::{decode_reply, MAX_ARRAY_DEPTH, MAX_BULK_LENGTH};
pub use frame::Reply;
pub use serializer::{
    command_args, encode_command, serialize_commandline, serialize_protocol, OutputFormat,
};
