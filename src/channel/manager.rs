use std::{sync::Arc, time::Duration};

use tokio::{sync::OnceCell, time::timeout};
use tracing::{debug, info, warn};

use super::{BrokerConnection, ChannelHandle, ResourceRegistry};
use crate::error::{BrokerClientError, ChannelError};

/// Таймаут операций брокера по умолчанию.
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(10);

/// Владелец канала одного издателя.
///
/// Канал создаётся лениво при первом запросе, регистрируется в реестре под
/// настроенным именем и переиспользуется до конца запуска конвейера.
/// Жизненный цикл: не инициализирован → открыт → закрыт.
pub struct ChannelManager {
    connection: Arc<dyn BrokerConnection>,
    /// Имя канала в реестре.
    name: String,
    op_timeout: Duration,
    handle: OnceCell<Arc<ChannelHandle>>,
}

impl ChannelManager {
    pub fn new(
        connection: Arc<dyn BrokerConnection>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            connection,
            name: name.into(),
            op_timeout: DEFAULT_OP_TIMEOUT,
            handle: OnceCell::new(),
        }
    }

    pub fn with_op_timeout(
        mut self,
        op_timeout: Duration,
    ) -> Self {
        self.op_timeout = op_timeout;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `true`, если канал уже был создан (даже если потом закрыт).
    pub fn is_initialized(&self) -> bool {
        self.handle.initialized()
    }

    /// Возвращает канал, создавая его при первом вызове.
    ///
    /// Конкурентные первые вызовы разделяют одно создание. Неудачное
    /// создание не кэшируется: следующий вызов попробует снова (повторов
    /// внутри вызова нет). Закрытый канал не пересоздаётся.
    ///
    /// # Возвращает
    /// - `Ok(handle)`: открытый канал, зарегистрированный в `registry`
    /// - `Err(ChannelError::ConnectionUnavailable)`: соединение закрыто
    /// - `Err(ChannelError::Creation)`: брокер отказал в создании канала
    /// - `Err(ChannelError::Unavailable)`: канал уже закрыт
    pub async fn channel(
        &self,
        registry: &ResourceRegistry,
    ) -> Result<Arc<ChannelHandle>, ChannelError> {
        let handle = self
            .handle
            .get_or_try_init(|| self.create(registry))
            .await?
            .clone();

        if !handle.is_open() {
            return Err(ChannelError::unavailable(&self.name));
        }
        Ok(handle)
    }

    async fn create(
        &self,
        registry: &ResourceRegistry,
    ) -> Result<Arc<ChannelHandle>, ChannelError> {
        if !self.connection.is_open() {
            warn!(channel = %self.name, "Broker connection unavailable");
            return Err(ChannelError::ConnectionUnavailable);
        }

        let channel = match timeout(self.op_timeout, self.connection.open_channel()).await {
            Ok(Ok(channel)) => channel,
            Ok(Err(BrokerClientError::ConnectionClosed)) => {
                return Err(ChannelError::ConnectionUnavailable)
            }
            Ok(Err(source)) => {
                return Err(ChannelError::Creation {
                    name: self.name.clone(),
                    source,
                })
            }
            Err(_) => {
                return Err(ChannelError::Creation {
                    name: self.name.clone(),
                    source: BrokerClientError::Timeout(self.op_timeout),
                })
            }
        };

        let handle = Arc::new(ChannelHandle::new(
            self.name.clone(),
            channel,
            self.op_timeout,
        ));
        if publish_named(registry, handle.clone()) {
            warn!(channel = %self.name, "Replaced an existing registry entry");
        }
        info!(channel = %self.name, id = handle.channel_id(), "Channel created");
        Ok(handle)
    }

    /// Закрывает канал (если он был создан) и убирает его из реестра.
    ///
    /// Запись удаляется, только если она всё ещё указывает на этот канал.
    /// Повторный вызов ничего не делает.
    pub async fn close(
        &self,
        registry: &ResourceRegistry,
    ) {
        let Some(handle) = self.handle.get() else {
            debug!(channel = %self.name, "No channel to close");
            return;
        };

        handle.close().await;

        if lookup_named(registry, &self.name).is_some_and(|current| Arc::ptr_eq(&current, handle)) {
            registry.remove(&self.name);
        }
    }
}

/// Регистрирует канал в реестре под его именем.
///
/// # Возвращает
/// - `true`, если под этим именем уже был ресурс
pub fn publish_named(
    registry: &ResourceRegistry,
    handle: Arc<ChannelHandle>,
) -> bool {
    registry.put(handle.name().to_string(), handle)
}

/// Ищет открытый или закрытый канал по имени.
pub fn lookup_named(
    registry: &ResourceRegistry,
    name: &str,
) -> Option<Arc<ChannelHandle>> {
    registry.get::<ChannelHandle>(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::MemoryBroker;

    /// Два запроса, одно создание канала.
    #[tokio::test]
    async fn test_channel_created_once() {
        let broker = MemoryBroker::new();
        let registry = ResourceRegistry::new();
        let manager = ChannelManager::new(Arc::new(broker.connect()), "rmq");

        assert!(!manager.is_initialized());
        let a = manager.channel(&registry).await.unwrap();
        let b = manager.channel(&registry).await.unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(broker.stats().channels_opened, 1);
        assert!(Arc::ptr_eq(&lookup_named(&registry, "rmq").unwrap(), &a));
    }

    /// Закрытое соединение: канал не создаётся, реестр пуст,
    /// следующая попытка снова обращается к соединению.
    #[tokio::test]
    async fn test_connection_unavailable() {
        let broker = MemoryBroker::new();
        let connection = Arc::new(broker.connect());
        connection.close();
        let registry = ResourceRegistry::new();
        let manager = ChannelManager::new(connection, "rmq");

        let err = manager.channel(&registry).await.unwrap_err();
        assert_eq!(err, ChannelError::ConnectionUnavailable);
        assert!(!manager.is_initialized());
        assert!(registry.is_empty());
    }

    /// После закрытия канал удаляется из реестра и не пересоздаётся.
    #[tokio::test]
    async fn test_close_removes_and_is_terminal() {
        let broker = MemoryBroker::new();
        let registry = ResourceRegistry::new();
        let manager = ChannelManager::new(Arc::new(broker.connect()), "rmq");

        manager.channel(&registry).await.unwrap();
        manager.close(&registry).await;
        manager.close(&registry).await;

        assert!(!registry.has("rmq"));
        assert_eq!(
            manager.channel(&registry).await.unwrap_err(),
            ChannelError::unavailable("rmq")
        );
        assert_eq!(broker.stats().channels_opened, 1);
        assert_eq!(broker.stats().channels_closed, 1);
    }

    /// Чужая запись с тем же именем не удаляется при закрытии.
    #[tokio::test]
    async fn test_close_keeps_foreign_entry() {
        let broker = MemoryBroker::new();
        let registry = ResourceRegistry::new();
        let first = ChannelManager::new(Arc::new(broker.connect()), "rmq");
        let second = ChannelManager::new(Arc::new(broker.connect()), "rmq");

        first.channel(&registry).await.unwrap();
        let newer = second.channel(&registry).await.unwrap();
        first.close(&registry).await;

        let current = lookup_named(&registry, "rmq").unwrap();
        assert!(Arc::ptr_eq(&current, &newer));
        assert!(current.is_open());
    }

    #[tokio::test]
    async fn test_close_without_channel() {
        let broker = MemoryBroker::new();
        let registry = ResourceRegistry::new();
        let manager = ChannelManager::new(Arc::new(broker.connect()), "rmq");
        manager.close(&registry).await;
        assert_eq!(broker.stats().channels_closed, 0);
    }
}
