use thiserror::Error;

use super::{BrokerClientError, ChannelError, ConversionError};

/// Errors returned by a single publish attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error("conversion failed: {0}")]
    Conversion(#[from] ConversionError),

    #[error("failed to publish data (exchange={exchange}, queue={queue}): {source}")]
    Broker {
        exchange: String,
        queue: String,
        #[source]
        source: BrokerClientError,
    },
}
