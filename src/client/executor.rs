use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use kvdump_error::DumpResult as ClientResult;

use crate::network::resp::Reply;

/// Выполнение одной команды на сервере.
///
/// Всё, что выше клиентского слоя (построитель команд, перечислитель
/// ключей, оркестратор), работает только через этот трейт. Ответы-ошибки
/// сервера приходят как `Err` с `ClientError::ServerError`.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(
        &self,
        args: &[Bytes],
    ) -> ClientResult<Reply>;
}

#[async_trait]
impl<T: Executor + ?Sized> Executor for Arc<T> {
    async fn execute(
        &self,
        args: &[Bytes],
    ) -> ClientResult<Reply> {
        (**self).execute(args).await
    }
}
