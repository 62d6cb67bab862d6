pub mod config;
pub mod connection;
pub mod executor;
pub mod factory;
pub mod pool;
pub mod tls;

// Публичный экспорт типов клиента, чтобы упростить доступ к ним из
// внешнего кода.
pub use config::*;
pub use connection::*;
pub use executor::*;
pub use factory::*;
pub use pool::*;
pub use tls::*;
