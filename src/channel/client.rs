use std::{collections::BTreeMap, fmt, sync::Arc};

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::BrokerClientError;

/// Номер доставки, выданный брокером.
///
/// Монотонно растёт в пределах одного канала и имеет смысл только для
/// него: тег канала A ничего не значит для канала B.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DeliveryTag(u64);

impl DeliveryTag {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for DeliveryTag {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for DeliveryTag {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl TryFrom<i64> for DeliveryTag {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u64::try_from(value)
            .map(Self)
            .map_err(|_| format!("negative delivery tag: {value}"))
    }
}

/// Свойства сообщения для `basic-publish`.
///
/// Издатель всегда передаёт `None`; тип нужен, чтобы сигнатура совпадала
/// с операцией брокера.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageProperties {
    pub content_type: Option<String>,
    pub delivery_mode: Option<u8>,
    pub headers: BTreeMap<String, String>,
}

/// Соединение с брокером. Установка соединения и аутентификация остаются заботой
/// вызывающей стороны, здесь нужен только `open_channel`.
#[async_trait]
pub trait BrokerConnection: Send + Sync {
    /// Открывает новый канал поверх соединения.
    async fn open_channel(&self) -> Result<Arc<dyn BrokerChannel>, BrokerClientError>;

    /// `false`, если соединение уже закрыто.
    fn is_open(&self) -> bool;
}

/// Канал брокера: единица операций publish/ack.
///
/// Типичные клиенты не гарантируют потокобезопасность канала, поэтому
/// вызовы сериализуются в [`super::ChannelHandle`].
#[async_trait]
pub trait BrokerChannel: Send + Sync {
    /// Идентификатор канала в пределах соединения.
    fn id(&self) -> u16;

    async fn basic_publish(
        &self,
        exchange: &str,
        routing_key: &str,
        properties: Option<&MessageProperties>,
        body: Bytes,
    ) -> Result<(), BrokerClientError>;

    async fn ack(
        &self,
        tag: DeliveryTag,
    ) -> Result<(), BrokerClientError>;

    async fn nack(
        &self,
        tag: DeliveryTag,
        requeue: bool,
    ) -> Result<(), BrokerClientError>;

    async fn reject(
        &self,
        tag: DeliveryTag,
        requeue: bool,
    ) -> Result<(), BrokerClientError>;

    async fn close(&self) -> Result<(), BrokerClientError>;
}
