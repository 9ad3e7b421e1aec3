//! Надёжная публикация сообщений в брокер и подтверждение доставок.
//!
//! Крейт предоставляет две стадии конвейера:
//!
//! - [`Publisher`] конвертирует токен цепочкой [`converter`] и публикует
//!   байты в брокер через общий именованный канал;
//! - [`DeliveryDispatcher`] применяет [`DeliveryAction`] (ack, nack,
//!   reject) к тегу доставки на канале, найденном по имени.
//!
//! Стадии обмениваются каналами через явный [`ResourceRegistry`].
//! Клиент брокера подключается через трейты [`BrokerConnection`] и
//! [`BrokerChannel`]; в [`broker`] есть реализация в памяти процесса.

/// In-process broker: queues, exchanges, per-channel delivery tags.
pub mod broker;
/// Broker client traits, channel handles, lazy channel manager, registry.
pub mod channel;
/// Layered settings: defaults, TOML file, `BURROW_*` environment.
pub mod config;
/// Payload model and the converter chain (string, binary, file offload).
pub mod converter;
/// Delivery actions and the dispatcher stage.
pub mod delivery;
/// Error types for every stage.
pub mod error;
/// Logging setup on top of `tracing-subscriber`.
pub mod logging;
/// Publisher stage.
pub mod publisher;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

pub use broker::{MemoryBroker, MemoryChannel, MemoryConnection};
pub use channel::{
    BrokerChannel, BrokerConnection, ChannelHandle, ChannelManager, DeliveryTag,
    ResourceRegistry,
};
pub use config::Settings;
pub use converter::{
    BinaryConverter, Converter, ConverterKind, Decoder, FileBasedConverter, FileBasedDecoder,
    Payload, PayloadKind, StringConverter,
};
pub use delivery::{DeliveryAction, DeliveryDispatcher};
pub use error::{
    BrokerClientError, BurrowError, BurrowResult, ChannelError, ConversionError, DeliveryError,
    PublishError,
};
pub use logging::{init_logging, LoggingConfig, LoggingHandle};
pub use publisher::{Publisher, RoutingTarget};
