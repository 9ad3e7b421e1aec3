use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicBool, AtomicU16, AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::time::timeout;
use tracing::{debug, trace};

use super::{Delivery, MemoryBroker};
use crate::{
    channel::{BrokerChannel, BrokerConnection, DeliveryTag, MessageProperties},
    error::BrokerClientError,
};

/// Соединение с [`MemoryBroker`].
pub struct MemoryConnection {
    broker: MemoryBroker,
    open: Arc<AtomicBool>,
    /// Счётчик идентификаторов каналов в пределах соединения.
    next_channel_id: AtomicU16,
}

/// Канал [`MemoryBroker`].
///
/// Теги доставки выдаются самим каналом, начиная с 1, и действительны
/// только для него.
pub struct MemoryChannel {
    id: u16,
    broker: MemoryBroker,
    connection_open: Arc<AtomicBool>,
    open: AtomicBool,
    next_tag: AtomicU64,
    /// Выданные, но ещё не подтверждённые доставки: тег -> доставка.
    unacked: Mutex<BTreeMap<u64, Delivery>>,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl MemoryConnection {
    pub(crate) fn new(broker: MemoryBroker) -> Self {
        Self {
            broker,
            open: Arc::new(AtomicBool::new(true)),
            next_channel_id: AtomicU16::new(0),
        }
    }

    /// Открывает канал с конкретным типом (для потребителей, которым нужен
    /// `basic_get`).
    pub fn open_memory_channel(&self) -> Result<Arc<MemoryChannel>, BrokerClientError> {
        if !self.is_open() {
            return Err(BrokerClientError::ConnectionClosed);
        }
        let id = self.next_channel_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.broker
            .counters()
            .channels_opened
            .fetch_add(1, Ordering::Relaxed);
        debug!(id, "Memory channel opened");

        Ok(Arc::new(MemoryChannel {
            id,
            broker: self.broker.clone(),
            connection_open: self.open.clone(),
            open: AtomicBool::new(true),
            next_tag: AtomicU64::new(0),
            unacked: Mutex::new(BTreeMap::new()),
        }))
    }

    /// Закрывает соединение. Все его каналы становятся непригодными.
    pub fn close(&self) {
        self.open.store(false, Ordering::Release);
    }
}

impl MemoryChannel {
    fn ensure_open(&self) -> Result<(), BrokerClientError> {
        if !self.connection_open.load(Ordering::Acquire) {
            return Err(BrokerClientError::ConnectionClosed);
        }
        if !self.open.load(Ordering::Acquire) {
            return Err(BrokerClientError::ChannelClosed(self.id));
        }
        Ok(())
    }

    /// Забирает одно сообщение из очереди (без автоподтверждения).
    ///
    /// # Возвращает
    /// - `Ok(Some(delivery))` с новым тегом этого канала
    /// - `Ok(None)`, если очередь пуста
    /// - `Err(NotFound)`, если очереди нет
    pub fn basic_get(
        &self,
        queue: &str,
    ) -> Result<Option<Delivery>, BrokerClientError> {
        self.ensure_open()?;
        let q = self.broker.queue(queue)?;
        let Some(message) = q.pop() else {
            return Ok(None);
        };

        let tag = DeliveryTag::new(self.next_tag.fetch_add(1, Ordering::Relaxed) + 1);
        let delivery = message.into_delivery(tag, q.name.clone());
        self.unacked.lock().insert(tag.value(), delivery.clone());
        trace!(channel = self.id, %tag, queue, "Message delivered");
        Ok(Some(delivery))
    }

    /// Ждёт сообщение из очереди не дольше `wait`.
    pub async fn consume(
        &self,
        queue: &str,
        wait: Duration,
    ) -> Result<Option<Delivery>, BrokerClientError> {
        let q = self.broker.queue(queue)?;
        let result = timeout(wait, async {
            loop {
                match self.basic_get(queue) {
                    Ok(None) => q.notify.notified().await,
                    other => return other,
                }
            }
        })
        .await;

        match result {
            Ok(res) => res,
            Err(_) => Ok(None),
        }
    }

    /// Количество неподтверждённых доставок на канале.
    pub fn unacked_count(&self) -> usize {
        self.unacked.lock().len()
    }

    fn take_unacked(
        &self,
        tag: DeliveryTag,
    ) -> Result<Delivery, BrokerClientError> {
        self.ensure_open()?;
        self.unacked.lock().remove(&tag.value()).ok_or_else(|| {
            BrokerClientError::PreconditionFailed(format!("unknown delivery tag {tag}"))
        })
    }

    fn settle(
        &self,
        delivery: Delivery,
        requeue: bool,
    ) {
        let queue = delivery.queue.clone();
        if requeue {
            self.broker.requeue(&queue, delivery.into_queued(true));
        } else {
            self.broker.dead_letter(&queue, delivery.into_queued(false));
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Реализации трейтов клиента брокера
////////////////////////////////////////////////////////////////////////////////

#[async_trait]
impl BrokerConnection for MemoryConnection {
    async fn open_channel(&self) -> Result<Arc<dyn BrokerChannel>, BrokerClientError> {
        let channel: Arc<dyn BrokerChannel> = self.open_memory_channel()?;
        Ok(channel)
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }
}

#[async_trait]
impl BrokerChannel for MemoryChannel {
    fn id(&self) -> u16 {
        self.id
    }

    async fn basic_publish(
        &self,
        exchange: &str,
        routing_key: &str,
        _properties: Option<&MessageProperties>,
        body: Bytes,
    ) -> Result<(), BrokerClientError> {
        self.ensure_open()?;
        self.broker.route(exchange, routing_key, body)?;
        Ok(())
    }

    async fn ack(
        &self,
        tag: DeliveryTag,
    ) -> Result<(), BrokerClientError> {
        self.take_unacked(tag)?;
        self.broker.counters().acked.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn nack(
        &self,
        tag: DeliveryTag,
        requeue: bool,
    ) -> Result<(), BrokerClientError> {
        let delivery = self.take_unacked(tag)?;
        self.settle(delivery, requeue);
        Ok(())
    }

    async fn reject(
        &self,
        tag: DeliveryTag,
        requeue: bool,
    ) -> Result<(), BrokerClientError> {
        let delivery = self.take_unacked(tag)?;
        self.settle(delivery, requeue);
        Ok(())
    }

    /// Закрывает канал; неподтверждённые сообщения возвращаются в очереди
    /// в исходном порядке.
    async fn close(&self) -> Result<(), BrokerClientError> {
        if !self.open.swap(false, Ordering::AcqRel) {
            return Err(BrokerClientError::ChannelClosed(self.id));
        }

        let pending = std::mem::take(&mut *self.unacked.lock());
        for (_, delivery) in pending.into_iter().rev() {
            let queue = delivery.queue.clone();
            self.broker.requeue(&queue, delivery.into_queued(true));
        }
        self.broker
            .counters()
            .channels_closed
            .fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
