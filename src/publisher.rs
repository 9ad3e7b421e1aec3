use std::{fmt, sync::Arc, time::Duration};

use bytes::Bytes;
use tracing::{debug, warn};

use crate::{
    channel::{BrokerConnection, ChannelManager, ResourceRegistry, DEFAULT_OP_TIMEOUT},
    converter::{Converter, Payload, PayloadKind, StringConverter},
    error::{ChannelError, PublishError},
};

/// Имя канала в реестре по умолчанию.
pub const DEFAULT_CHANNEL_NAME: &str = "rmq";

/// Адрес публикации: exchange и ключ маршрутизации (имя очереди).
///
/// Оба поля могут быть пустыми; комбинация не проверяется локально и
/// передаётся брокеру как есть.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingTarget {
    pub exchange: String,
    pub queue: String,
}

/// Стадия конвейера, публикующая каждый токен в брокер.
///
/// Владеет своим [`ChannelManager`]: канал создаётся при первой публикации
/// и закрывается в [`Publisher::wrap_up`].
pub struct Publisher {
    target: RoutingTarget,
    converter: Arc<dyn Converter>,
    manager: ChannelManager,
}

#[derive(Debug, Default)]
pub struct PublisherBuilder {
    exchange: Option<String>,
    queue: Option<String>,
    channel_name: Option<String>,
    converter: Option<Arc<dyn Converter>>,
    op_timeout: Option<Duration>,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl Publisher {
    pub fn builder() -> PublisherBuilder {
        PublisherBuilder::default()
    }

    pub fn target(&self) -> &RoutingTarget {
        &self.target
    }

    pub fn channel_name(&self) -> &str {
        self.manager.name()
    }

    /// Виды токенов, которые принимает стадия (определяются конвертером).
    pub fn accepts(&self) -> &[PayloadKind] {
        self.converter.accepts()
    }

    /// Одна попытка публикации токена.
    ///
    /// Порядок: канал, затем конвертация, затем ровно один `basic_publish`.
    /// Ошибка конвертации возвращается до обращения к брокеру. Если брокер
    /// не принял сообщение, результат конвертации откатывается
    /// ([`Converter::discard`]). Повторов нет: решение о повторе принимает
    /// вызывающий.
    pub async fn publish(
        &self,
        registry: &ResourceRegistry,
        payload: &Payload,
    ) -> Result<(), PublishError> {
        let handle = self.manager.channel(registry).await.inspect_err(|e| {
            warn!(channel = %self.manager.name(), error = %e, "Channel unavailable for publish");
        })?;

        let body = self.converter.convert(payload).inspect_err(|e| {
            warn!(converter = %self.converter.quick_info(), error = %e, "Conversion failed");
        })?;
        let body = Bytes::from(body);

        let RoutingTarget { exchange, queue } = &self.target;
        let result = handle
            .basic_publish(exchange, queue, None, body.clone())
            .await;
        if result.is_err() {
            // Сообщение не ушло, откатываем конвертацию.
            self.converter.discard(&body);
        }

        match result {
            Ok(()) => {
                debug!(exchange = %exchange, queue = %queue, "Token published");
                Ok(())
            }
            Err(ChannelError::Operation { source, .. }) => {
                warn!(exchange = %exchange, queue = %queue, error = %source, "Publish refused by broker");
                Err(PublishError::Broker {
                    exchange: exchange.clone(),
                    queue: queue.clone(),
                    source,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Закрывает канал стадии и убирает его из реестра. Повторный вызов
    /// ничего не делает.
    pub async fn wrap_up(
        &self,
        registry: &ResourceRegistry,
    ) {
        self.manager.close(registry).await;
    }

    /// Краткое описание: `exchange: X, queue: Y, converter: Z`.
    pub fn quick_info(&self) -> String {
        format!(
            "exchange: {}, queue: {}, converter: {}",
            or_empty(&self.target.exchange),
            or_empty(&self.target.queue),
            self.converter.quick_info()
        )
    }
}

impl PublisherBuilder {
    pub fn exchange(
        mut self,
        exchange: impl Into<String>,
    ) -> Self {
        self.exchange = Some(exchange.into());
        self
    }

    pub fn queue(
        mut self,
        queue: impl Into<String>,
    ) -> Self {
        self.queue = Some(queue.into());
        self
    }

    pub fn channel_name(
        mut self,
        name: impl Into<String>,
    ) -> Self {
        self.channel_name = Some(name.into());
        self
    }

    pub fn converter(
        mut self,
        converter: Arc<dyn Converter>,
    ) -> Self {
        self.converter = Some(converter);
        self
    }

    pub fn op_timeout(
        mut self,
        op_timeout: Duration,
    ) -> Self {
        self.op_timeout = Some(op_timeout);
        self
    }

    /// Собирает издателя поверх соединения. Незаданные поля берутся по
    /// умолчанию: пустой адрес, канал `rmq`, [`StringConverter`].
    pub fn build(
        self,
        connection: Arc<dyn BrokerConnection>,
    ) -> Publisher {
        let name = self
            .channel_name
            .unwrap_or_else(|| DEFAULT_CHANNEL_NAME.to_string());
        Publisher {
            target: RoutingTarget {
                exchange: self.exchange.unwrap_or_default(),
                queue: self.queue.unwrap_or_default(),
            },
            converter: self
                .converter
                .unwrap_or_else(|| Arc::new(StringConverter::new())),
            manager: ChannelManager::new(connection, name)
                .with_op_timeout(self.op_timeout.unwrap_or(DEFAULT_OP_TIMEOUT)),
        }
    }
}

fn or_empty(name: &str) -> &str {
    if name.is_empty() {
        "-empty-"
    } else {
        name
    }
}

impl fmt::Debug for Publisher {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Publisher")
            .field("target", &self.target)
            .field("converter", &self.converter.quick_info())
            .field("channel", &self.manager.name())
            .finish()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
