//! Управление каналами брокера.
//!
//! - `client`: трейты клиента брокера (`BrokerConnection`, `BrokerChannel`)
//!   и типы протокола (`DeliveryTag`, `MessageProperties`).
//! - `handle`: `ChannelHandle`, именованный канал с сериализацией операций.
//! - `manager`: ленивое создание канала и его регистрация в реестре.
//! - `registry`: общий реестр именованных ресурсов между стадиями.

pub mod client;
pub mod handle;
pub mod manager;
pub mod registry;

pub use client::{BrokerChannel, BrokerConnection, DeliveryTag, MessageProperties};
pub use handle::{ChannelHandle, ChannelState};
pub use manager::{lookup_named, publish_named, ChannelManager, DEFAULT_OP_TIMEOUT};
pub use registry::ResourceRegistry;
