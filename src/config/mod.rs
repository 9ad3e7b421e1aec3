pub mod settings;

pub use settings::{BrokerSettings, DeliverySettings, PublisherSettings, Settings};
