pub mod broker;
pub mod channel;
pub mod conversion;
pub mod delivery;
pub mod logging;
pub mod publish;

pub use broker::BrokerClientError;
pub use channel::ChannelError;
pub use conversion::ConversionError;
pub use delivery::DeliveryError;
pub use logging::LoggingError;
pub use publish::PublishError;

use thiserror::Error;

pub type BurrowResult<T> = Result<T, BurrowError>;

/// Top-level error for code that drives several stages at once
/// (the CLI, integration glue).
#[derive(Debug, Error)]
pub enum BurrowError {
    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Broker error: {0}")]
    Broker(#[from] BrokerClientError),

    #[error("Logging error: {0}")]
    Logging(#[from] LoggingError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
