use std::sync::Arc;

use bytes::Bytes;

use crate::channel::DeliveryTag;

/// Сообщение, лежащее в очереди брокера.
#[derive(Debug, Clone)]
pub struct QueuedMessage {
    /// Exchange, через который пришло сообщение (`""` означает exchange по умолчанию).
    pub exchange: Arc<str>,
    pub routing_key: Arc<str>,
    pub body: Bytes,
    /// `true`, если сообщение уже доставлялось и было возвращено в очередь.
    pub redelivered: bool,
}

/// Сообщение, выданное потребителю через канал.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Тег доставки в пределах канала, выдавшего сообщение.
    pub tag: DeliveryTag,
    /// Очередь, из которой взято сообщение.
    pub queue: Arc<str>,
    pub exchange: Arc<str>,
    pub routing_key: Arc<str>,
    pub body: Bytes,
    pub redelivered: bool,
}

impl QueuedMessage {
    pub fn new(
        exchange: impl Into<Arc<str>>,
        routing_key: impl Into<Arc<str>>,
        body: Bytes,
    ) -> Self {
        Self {
            exchange: exchange.into(),
            routing_key: routing_key.into(),
            body,
            redelivered: false,
        }
    }

    pub(crate) fn into_delivery(
        self,
        tag: DeliveryTag,
        queue: Arc<str>,
    ) -> Delivery {
        Delivery {
            tag,
            queue,
            exchange: self.exchange,
            routing_key: self.routing_key,
            body: self.body,
            redelivered: self.redelivered,
        }
    }
}

impl Delivery {
    /// Возвращает сообщение в вид для очереди (при requeue или dead-letter).
    pub(crate) fn into_queued(
        self,
        redelivered: bool,
    ) -> QueuedMessage {
        QueuedMessage {
            exchange: self.exchange,
            routing_key: self.routing_key,
            body: self.body,
            redelivered,
        }
    }
}
