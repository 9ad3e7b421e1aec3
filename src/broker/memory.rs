use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tracing::{debug, trace};

use super::{MemoryConnection, QueuedMessage};
use crate::error::BrokerClientError;

type QueueKey = Arc<str>;
type ExchangeKey = Arc<str>;

/// Тип exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeKind {
    /// Маршрутизация по точному совпадению ключа привязки.
    Direct,
    /// Копия сообщения в каждую привязанную очередь.
    Fanout,
}

/// Параметры очереди.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueOptions {
    /// Очередь для сообщений, отклонённых без повторной постановки.
    /// Если не задана, такие сообщения отбрасываются.
    pub dead_letter_queue: Option<String>,
}

/// Очередь брокера.
pub(crate) struct Queue {
    pub(crate) name: QueueKey,
    messages: Mutex<VecDeque<QueuedMessage>>,
    /// Будит потребителей, ожидающих сообщения.
    pub(crate) notify: Notify,
    options: QueueOptions,
}

struct Exchange {
    kind: ExchangeKind,
    /// Привязки: (очередь, ключ).
    bindings: Vec<(QueueKey, Arc<str>)>,
}

/// Снимок счётчиков брокера.
///
/// # Поля
/// * `published` - принятые `basic-publish`.
/// * `unroutable` - опубликованные сообщения, не попавшие ни в одну очередь.
/// * `acked` - подтверждённые доставки.
/// * `requeued` - доставки, возвращённые в очередь (nack/reject/close).
/// * `dead_lettered` - доставки, переложенные в dead-letter очередь.
/// * `discarded` - доставки, отброшенные брокером.
/// * `channels_opened` / `channels_closed` - жизненный цикл каналов.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BrokerStats {
    pub published: usize,
    pub unroutable: usize,
    pub acked: usize,
    pub requeued: usize,
    pub dead_lettered: usize,
    pub discarded: usize,
    pub channels_opened: usize,
    pub channels_closed: usize,
}

#[derive(Default)]
pub(crate) struct Counters {
    pub(crate) published: AtomicUsize,
    pub(crate) unroutable: AtomicUsize,
    pub(crate) acked: AtomicUsize,
    pub(crate) requeued: AtomicUsize,
    pub(crate) dead_lettered: AtomicUsize,
    pub(crate) discarded: AtomicUsize,
    pub(crate) channels_opened: AtomicUsize,
    pub(crate) channels_closed: AtomicUsize,
}

#[derive(Default)]
struct BrokerState {
    exchanges: DashMap<ExchangeKey, Exchange>,
    queues: DashMap<QueueKey, Arc<Queue>>,
    counters: Counters,
}

/// Внутрипроцессный брокер с AMQP-подобной семантикой.
///
/// Поддерживает:
/// - exchange по умолчанию (`""`): ключ маршрутизации = имя очереди
/// - именованные exchange типов `direct` и `fanout`
/// - теги доставки по каналам, ack/nack/reject, requeue и dead-letter
/// - возврат неподтверждённых сообщений в очередь при закрытии канала
///
/// Сообщения без подходящей очереди молча отбрасываются (как
/// non-mandatory publish в AMQP), публикация в необъявленный exchange
/// возвращает `NotFound`.
///
/// Клоны разделяют одно состояние.
#[derive(Clone, Default)]
pub struct MemoryBroker {
    state: Arc<BrokerState>,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Открывает новое соединение с брокером.
    pub fn connect(&self) -> MemoryConnection {
        MemoryConnection::new(self.clone())
    }

    /// Объявляет очередь. Повторное объявление сохраняет существующую.
    pub fn declare_queue(
        &self,
        name: &str,
        options: QueueOptions,
    ) {
        let key: QueueKey = Arc::from(name);
        self.state.queues.entry(key.clone()).or_insert_with(|| {
            debug!(queue = name, "Queue declared");
            Arc::new(Queue {
                name: key,
                messages: Mutex::new(VecDeque::new()),
                notify: Notify::new(),
                options,
            })
        });
    }

    /// Объявляет exchange.
    ///
    /// # Возвращает
    /// - `Err(PreconditionFailed)` для пустого имени или при повторном
    ///   объявлении с другим типом
    pub fn declare_exchange(
        &self,
        name: &str,
        kind: ExchangeKind,
    ) -> Result<(), BrokerClientError> {
        if name.is_empty() {
            return Err(BrokerClientError::PreconditionFailed(
                "the default exchange cannot be redeclared".into(),
            ));
        }
        let entry = self
            .state
            .exchanges
            .entry(Arc::from(name))
            .or_insert_with(|| Exchange {
                kind,
                bindings: Vec::new(),
            });
        if entry.kind != kind {
            return Err(BrokerClientError::PreconditionFailed(format!(
                "exchange '{name}' already declared as {:?}",
                entry.kind
            )));
        }
        Ok(())
    }

    /// Привязывает очередь к exchange с ключом маршрутизации.
    pub fn bind_queue(
        &self,
        exchange: &str,
        queue: &str,
        routing_key: &str,
    ) -> Result<(), BrokerClientError> {
        let queue_key = self
            .state
            .queues
            .get(queue)
            .map(|q| q.name.clone())
            .ok_or_else(|| BrokerClientError::NotFound(no_queue(queue)))?;
        let mut ex = self
            .state
            .exchanges
            .get_mut(exchange)
            .ok_or_else(|| BrokerClientError::NotFound(no_exchange(exchange)))?;

        let binding = (queue_key, Arc::from(routing_key));
        if !ex.bindings.contains(&binding) {
            ex.bindings.push(binding);
        }
        Ok(())
    }

    /// Количество готовых к выдаче сообщений в очереди.
    pub fn queue_len(
        &self,
        name: &str,
    ) -> Option<usize> {
        self.state.queues.get(name).map(|q| q.messages.lock().len())
    }

    pub fn stats(&self) -> BrokerStats {
        let c = &self.state.counters;
        BrokerStats {
            published: c.published.load(Ordering::Relaxed),
            unroutable: c.unroutable.load(Ordering::Relaxed),
            acked: c.acked.load(Ordering::Relaxed),
            requeued: c.requeued.load(Ordering::Relaxed),
            dead_lettered: c.dead_lettered.load(Ordering::Relaxed),
            discarded: c.discarded.load(Ordering::Relaxed),
            channels_opened: c.channels_opened.load(Ordering::Relaxed),
            channels_closed: c.channels_closed.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn counters(&self) -> &Counters {
        &self.state.counters
    }

    pub(crate) fn queue(
        &self,
        name: &str,
    ) -> Result<Arc<Queue>, BrokerClientError> {
        self.state
            .queues
            .get(name)
            .map(|q| q.value().clone())
            .ok_or_else(|| BrokerClientError::NotFound(no_queue(name)))
    }

    /// Маршрутизирует сообщение.
    ///
    /// # Возвращает
    /// - количество очередей, получивших копию сообщения
    pub(crate) fn route(
        &self,
        exchange: &str,
        routing_key: &str,
        body: Bytes,
    ) -> Result<usize, BrokerClientError> {
        let targets: Vec<Arc<Queue>> = if exchange.is_empty() {
            self.state
                .queues
                .get(routing_key)
                .map(|q| vec![q.value().clone()])
                .unwrap_or_default()
        } else {
            let ex = self
                .state
                .exchanges
                .get(exchange)
                .ok_or_else(|| BrokerClientError::NotFound(no_exchange(exchange)))?;
            ex.bindings
                .iter()
                .filter(|(_, key)| ex.kind == ExchangeKind::Fanout || &**key == routing_key)
                .filter_map(|(queue, _)| self.state.queues.get(queue).map(|q| q.value().clone()))
                .collect()
        };

        let counters = &self.state.counters;
        counters.published.fetch_add(1, Ordering::Relaxed);
        if targets.is_empty() {
            counters.unroutable.fetch_add(1, Ordering::Relaxed);
            trace!(exchange, routing_key, "Message unroutable, dropped");
            return Ok(0);
        }

        let exchange: Arc<str> = Arc::from(exchange);
        let routing_key: Arc<str> = Arc::from(routing_key);
        for queue in &targets {
            queue.push_back(QueuedMessage {
                exchange: exchange.clone(),
                routing_key: routing_key.clone(),
                body: body.clone(),
                redelivered: false,
            });
        }
        Ok(targets.len())
    }

    /// Возвращает сообщение в голову очереди.
    pub(crate) fn requeue(
        &self,
        queue: &str,
        message: QueuedMessage,
    ) {
        match self.state.queues.get(queue) {
            Some(q) => {
                q.push_front(message);
                self.state.counters.requeued.fetch_add(1, Ordering::Relaxed);
            }
            None => {
                self.state.counters.discarded.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Перекладывает сообщение в dead-letter очередь или отбрасывает его.
    pub(crate) fn dead_letter(
        &self,
        queue: &str,
        message: QueuedMessage,
    ) {
        let target = self
            .state
            .queues
            .get(queue)
            .and_then(|q| q.options.dead_letter_queue.clone())
            .and_then(|dlq| self.state.queues.get(dlq.as_str()).map(|q| q.value().clone()));

        match target {
            Some(dlq) => {
                debug!(queue, dead_letter_queue = %dlq.name, "Message dead-lettered");
                dlq.push_back(message);
                self.state
                    .counters
                    .dead_lettered
                    .fetch_add(1, Ordering::Relaxed);
            }
            None => {
                debug!(queue, "Message discarded");
                self.state.counters.discarded.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

impl Queue {
    fn push_back(
        &self,
        message: QueuedMessage,
    ) {
        self.messages.lock().push_back(message);
        self.notify.notify_one();
    }

    fn push_front(
        &self,
        message: QueuedMessage,
    ) {
        self.messages.lock().push_front(message);
        self.notify.notify_one();
    }

    pub(crate) fn pop(&self) -> Option<QueuedMessage> {
        self.messages.lock().pop_front()
    }
}

fn no_queue(name: &str) -> String {
    format!("no queue '{name}' in vhost '/'")
}

fn no_exchange(name: &str) -> String {
    format!("no exchange '{name}' in vhost '/'")
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
