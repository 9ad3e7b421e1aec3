//! Подтверждение доставок.
//!
//! [`DeliveryAction`] описывает политику (ack, nack, reject или ничего), а
//! [`DeliveryDispatcher`] применяет её к тегу доставки на канале, найденном
//! в реестре по имени.

pub mod action;
pub mod dispatcher;

pub use action::DeliveryAction;
pub use dispatcher::DeliveryDispatcher;

pub use crate::channel::DeliveryTag;
