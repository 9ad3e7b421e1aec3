//! Брокер сообщений в памяти процесса.
//!
//! Реализует клиентские трейты [`crate::channel::BrokerConnection`] и
//! [`crate::channel::BrokerChannel`] с семантикой, близкой к AMQP 0-9-1:
//! exchange по умолчанию маршрутизирует по имени очереди, теги доставки
//! выдаются каналом, неподтверждённые сообщения возвращаются в очередь
//! при закрытии канала.

mod connection;
mod memory;
mod message;

pub use connection::{MemoryChannel, MemoryConnection};
pub use memory::{BrokerStats, ExchangeKind, MemoryBroker, QueueOptions};
pub use message::{Delivery, QueuedMessage};
