use std::{fmt, future::Future, sync::Arc, time::Duration};

use bytes::Bytes;
use parking_lot::RwLock;
use tokio::{sync::Mutex, time::timeout};
use tracing::{debug, info, warn};

use super::{BrokerChannel, DeliveryTag, MessageProperties};
use crate::error::{BrokerClientError, ChannelError};

/// Состояние канала. `Closed` терминально.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Open,
    Closed,
}

/// Открытый канал брокера с именем для поиска между стадиями.
///
/// Все операции над одним дескриптором сериализуются асинхронным мьютексом:
/// канал может использоваться из нескольких конкурентных задач, а клиенты
/// брокера обычно не потокобезопасны на уровне канала. Состояние
/// проверяется под тем же мьютексом, поэтому операция, конкурирующая с
/// `close`, либо завершается до закрытия, либо получает `Unavailable`.
///
/// Каждый вызов брокера ограничен `op_timeout`.
pub struct ChannelHandle {
    /// Имя, под которым канал зарегистрирован в реестре.
    name: String,
    /// Канал брокера.
    channel: Arc<dyn BrokerChannel>,
    state: RwLock<ChannelState>,
    /// Сериализует операции над каналом.
    op_lock: Mutex<()>,
    op_timeout: Duration,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl ChannelHandle {
    pub fn new(
        name: impl Into<String>,
        channel: Arc<dyn BrokerChannel>,
        op_timeout: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            channel,
            state: RwLock::new(ChannelState::Open),
            op_lock: Mutex::new(()),
            op_timeout,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Идентификатор канала в пределах соединения.
    pub fn channel_id(&self) -> u16 {
        self.channel.id()
    }

    pub fn state(&self) -> ChannelState {
        *self.state.read()
    }

    pub fn is_open(&self) -> bool {
        self.state() == ChannelState::Open
    }

    pub async fn basic_publish(
        &self,
        exchange: &str,
        routing_key: &str,
        properties: Option<&MessageProperties>,
        body: Bytes,
    ) -> Result<(), ChannelError> {
        let len = body.len();
        self.run(|ch| async move {
            ch.basic_publish(exchange, routing_key, properties, body)
                .await
        })
        .await?;
        debug!(
            channel = %self.name,
            exchange,
            routing_key,
            bytes = len,
            "Message published"
        );
        Ok(())
    }

    pub async fn ack(
        &self,
        tag: DeliveryTag,
    ) -> Result<(), ChannelError> {
        self.run(|ch| async move { ch.ack(tag).await }).await
    }

    pub async fn nack(
        &self,
        tag: DeliveryTag,
        requeue: bool,
    ) -> Result<(), ChannelError> {
        self.run(|ch| async move { ch.nack(tag, requeue).await })
            .await
    }

    pub async fn reject(
        &self,
        tag: DeliveryTag,
        requeue: bool,
    ) -> Result<(), ChannelError> {
        self.run(|ch| async move { ch.reject(tag, requeue).await })
            .await
    }

    /// Закрывает канал.
    ///
    /// Первый вызов переводит канал в `Closed` и закрывает его у брокера;
    /// ошибка брокера при закрытии только логируется. Повторные вызовы
    /// ничего не делают.
    pub async fn close(&self) {
        let _guard = self.op_lock.lock().await;
        {
            let mut state = self.state.write();
            if *state == ChannelState::Closed {
                debug!(channel = %self.name, "Channel already closed");
                return;
            }
            *state = ChannelState::Closed;
        }

        let result = match timeout(self.op_timeout, self.channel.close()).await {
            Ok(result) => result,
            Err(_) => Err(BrokerClientError::Timeout(self.op_timeout)),
        };
        match result {
            Ok(()) => info!(channel = %self.name, id = self.channel_id(), "Channel closed"),
            Err(e) => warn!(channel = %self.name, error = %e, "Failed to close channel cleanly"),
        }
    }

    /// Выполняет одну операцию брокера под мьютексом и с таймаутом.
    async fn run<F, Fut>(
        &self,
        op: F,
    ) -> Result<(), ChannelError>
    where
        F: FnOnce(Arc<dyn BrokerChannel>) -> Fut,
        Fut: Future<Output = Result<(), BrokerClientError>>,
    {
        let _guard = self.op_lock.lock().await;
        if self.state() == ChannelState::Closed {
            return Err(ChannelError::unavailable(&self.name));
        }

        let result = match timeout(self.op_timeout, op(self.channel.clone())).await {
            Ok(result) => result,
            Err(_) => Err(BrokerClientError::Timeout(self.op_timeout)),
        };
        result.map_err(|source| ChannelError::Operation {
            name: self.name.clone(),
            source,
        })
    }
}

impl fmt::Debug for ChannelHandle {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("ChannelHandle")
            .field("name", &self.name)
            .field("id", &self.channel_id())
            .field("state", &self.state())
            .finish()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
