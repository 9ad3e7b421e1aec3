use tracing::{debug, warn};

use super::{DeliveryAction, DeliveryTag};
use crate::{
    channel::{lookup_named, ResourceRegistry},
    converter::{Payload, PayloadKind},
    error::{ChannelError, DeliveryError},
};

/// Стадия, применяющая [`DeliveryAction`] к тегам доставки.
///
/// Канал ищется в реестре по имени при каждом вызове; стадия им не
/// владеет и не закрывает его. Теги имеют смысл только для канала,
/// который их выдал, поэтому имя должно совпадать с именем канала
/// потребителя.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryDispatcher {
    channel_name: String,
    action: DeliveryAction,
}

impl DeliveryDispatcher {
    pub fn new(
        channel_name: impl Into<String>,
        action: DeliveryAction,
    ) -> Self {
        Self {
            channel_name: channel_name.into(),
            action,
        }
    }

    pub fn channel_name(&self) -> &str {
        &self.channel_name
    }

    pub fn action(&self) -> DeliveryAction {
        self.action
    }

    /// Краткое описание: `channel: X, action: Y`.
    pub fn quick_info(&self) -> String {
        format!("channel: {}, action: {}", self.channel_name, self.action)
    }

    /// Токены стадии: целочисленные теги доставки.
    pub fn accepts(&self) -> &'static [PayloadKind] {
        &[PayloadKind::Int]
    }

    /// Применяет действие к тегу.
    ///
    /// Канал должен быть найден и открыт даже для `NoAction`. Если его нет,
    /// брокер не вызывается.
    ///
    /// # Возвращает
    /// - `Err(DeliveryError::Channel(Unavailable))`: канала нет или он закрыт
    /// - `Err(DeliveryError::Broker)`: брокер отказал
    pub async fn perform_action(
        &self,
        registry: &ResourceRegistry,
        tag: DeliveryTag,
    ) -> Result<(), DeliveryError> {
        let Some(handle) = lookup_named(registry, &self.channel_name).filter(|h| h.is_open()) else {
            warn!(channel = %self.channel_name, %tag, action = %self.action, "Channel unavailable for delivery action");
            return Err(ChannelError::unavailable(&self.channel_name).into());
        };

        match self.action.execute(&handle, tag).await {
            Ok(()) => {
                debug!(channel = %self.channel_name, %tag, action = %self.action, "Delivery action performed");
                Ok(())
            }
            Err(ChannelError::Operation { source, .. }) => {
                warn!(channel = %self.channel_name, %tag, action = %self.action, error = %source, "Delivery action refused");
                Err(DeliveryError::Broker {
                    action: self.action,
                    tag,
                    source,
                })
            }
            Err(e) => {
                warn!(channel = %self.channel_name, %tag, error = %e, "Delivery action failed");
                Err(e.into())
            }
        }
    }

    /// То же, что [`perform_action`](Self::perform_action), но тег берётся
    /// из токена конвейера (неотрицательный `Payload::Int`).
    pub async fn perform_token(
        &self,
        registry: &ResourceRegistry,
        token: &Payload,
    ) -> Result<(), DeliveryError> {
        let tag = match token {
            Payload::Int(value) => DeliveryTag::try_from(*value).map_err(DeliveryError::InvalidTag)?,
            other => {
                return Err(DeliveryError::InvalidTag(format!(
                    "expected an int token, got {}",
                    other.kind()
                )))
            }
        };
        self.perform_action(registry, tag).await
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
