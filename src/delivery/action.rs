use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    channel::{ChannelHandle, DeliveryTag},
    error::ChannelError,
};

/// Действие над доставкой.
///
/// Строковое представление (конфигурация, CLI): `none`, `ack`, `nack`,
/// `nack-requeue`, `reject`, `reject-requeue`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DeliveryAction {
    /// Ничего не делать с доставкой.
    #[default]
    NoAction,
    Ack,
    Nack {
        requeue: bool,
    },
    Reject {
        requeue: bool,
    },
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl DeliveryAction {
    /// Все варианты в порядке строкового представления.
    pub const ALL: [DeliveryAction; 6] = [
        DeliveryAction::NoAction,
        DeliveryAction::Ack,
        DeliveryAction::Nack { requeue: false },
        DeliveryAction::Nack { requeue: true },
        DeliveryAction::Reject { requeue: false },
        DeliveryAction::Reject { requeue: true },
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryAction::NoAction => "none",
            DeliveryAction::Ack => "ack",
            DeliveryAction::Nack { requeue: false } => "nack",
            DeliveryAction::Nack { requeue: true } => "nack-requeue",
            DeliveryAction::Reject { requeue: false } => "reject",
            DeliveryAction::Reject { requeue: true } => "reject-requeue",
        }
    }

    /// `true`, если действие обращается к брокеру.
    pub fn touches_broker(&self) -> bool {
        !matches!(self, DeliveryAction::NoAction)
    }

    /// Применяет действие к тегу на канале.
    ///
    /// `NoAction` возвращает `Ok(())`, не обращаясь к брокеру.
    pub async fn execute(
        &self,
        channel: &ChannelHandle,
        tag: DeliveryTag,
    ) -> Result<(), ChannelError> {
        match *self {
            DeliveryAction::NoAction => Ok(()),
            DeliveryAction::Ack => channel.ack(tag).await,
            DeliveryAction::Nack { requeue } => channel.nack(tag, requeue).await,
            DeliveryAction::Reject { requeue } => channel.reject(tag, requeue).await,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Реализации трейтов
////////////////////////////////////////////////////////////////////////////////

impl fmt::Display for DeliveryAction {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == normalized)
            .ok_or_else(|| {
                format!(
                    "unknown delivery action '{s}', expected one of: none, ack, nack, nack-requeue, reject, reject-requeue"
                )
            })
    }
}

impl TryFrom<String> for DeliveryAction {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DeliveryAction> for String {
    fn from(action: DeliveryAction) -> Self {
        action.as_str().to_string()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use bytes::Bytes;
    use rstest::rstest;

    use super::*;
    use crate::broker::{MemoryBroker, QueueOptions};

    #[rstest]
    #[case("none", DeliveryAction::NoAction)]
    #[case("ack", DeliveryAction::Ack)]
    #[case("nack", DeliveryAction::Nack { requeue: false })]
    #[case("nack-requeue", DeliveryAction::Nack { requeue: true })]
    #[case("reject", DeliveryAction::Reject { requeue: false })]
    #[case("Reject-Requeue", DeliveryAction::Reject { requeue: true })]
    fn test_parse(
        #[case] input: &str,
        #[case] expected: DeliveryAction,
    ) {
        assert_eq!(input.parse::<DeliveryAction>().unwrap(), expected);
        assert_eq!(expected.to_string(), input.to_ascii_lowercase());
    }

    /// По умолчанию стадия ничего не делает с доставкой.
    #[test]
    fn test_default_is_no_action() {
        assert_eq!(DeliveryAction::default(), DeliveryAction::NoAction);
        assert!(!DeliveryAction::default().touches_broker());
    }

    #[test]
    fn test_parse_unknown() {
        let err = "drop".parse::<DeliveryAction>().unwrap_err();
        assert!(err.contains("unknown delivery action 'drop'"));
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&DeliveryAction::Nack { requeue: true }).unwrap();
        assert_eq!(json, "\"nack-requeue\"");
        let back: DeliveryAction = serde_json::from_str("\"reject\"").unwrap();
        assert_eq!(back, DeliveryAction::Reject { requeue: false });
        assert!(serde_json::from_str::<DeliveryAction>("\"maybe\"").is_err());
    }

    /// Каждое действие вызывает соответствующую операцию брокера.
    #[rstest]
    #[case(DeliveryAction::NoAction, 1, 0)]
    #[case(DeliveryAction::Ack, 0, 0)]
    #[case(DeliveryAction::Nack { requeue: true }, 1, 1)]
    #[case(DeliveryAction::Reject { requeue: true }, 1, 1)]
    #[case(DeliveryAction::Nack { requeue: false }, 0, 0)]
    #[case(DeliveryAction::Reject { requeue: false }, 0, 0)]
    #[tokio::test]
    async fn test_execute_on_memory_broker(
        #[case] action: DeliveryAction,
        #[case] left_in_queue_after_close: usize,
        #[case] requeued: usize,
    ) {
        let broker = MemoryBroker::new();
        broker.declare_queue("q", QueueOptions::default());
        let channel = broker.connect().open_memory_channel().unwrap();
        channel_publish(&broker, "q").await;
        let delivery = channel.basic_get("q").unwrap().unwrap();

        let handle = ChannelHandle::new("rmq", channel.clone(), Duration::from_secs(1));
        action.execute(&handle, delivery.tag).await.unwrap();
        assert_eq!(broker.stats().requeued, requeued);

        // NoAction оставляет доставку неподтверждённой: при закрытии она
        // возвращается в очередь.
        handle.close().await;
        assert_eq!(broker.queue_len("q"), Some(left_in_queue_after_close));
    }

    async fn channel_publish(
        broker: &MemoryBroker,
        queue: &str,
    ) {
        use crate::channel::BrokerChannel;

        let ch: Arc<dyn BrokerChannel> = broker.connect().open_memory_channel().unwrap();
        ch.basic_publish("", queue, None, Bytes::from_static(b"m"))
            .await
            .unwrap();
    }
}
