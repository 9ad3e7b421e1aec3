use thiserror::Error;

use super::{BrokerClientError, ChannelError};
use crate::delivery::{DeliveryAction, DeliveryTag};

/// Errors returned by a delivery action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error("{action} of delivery tag {tag} failed: {source}")]
    Broker {
        action: DeliveryAction,
        tag: DeliveryTag,
        #[source]
        source: BrokerClientError,
    },

    #[error("invalid delivery tag: {0}")]
    InvalidTag(String),
}
