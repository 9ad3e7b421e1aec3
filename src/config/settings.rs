use std::{path::Path, time::Duration};

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::{
    converter::ConverterKind, delivery::DeliveryAction, logging::LoggingConfig,
    publisher::DEFAULT_CHANNEL_NAME,
};

/// Environment variable prefix, e.g. `BURROW_PUBLISHER__QUEUE=jobs`.
pub const ENV_PREFIX: &str = "BURROW";

/// Publisher stage settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublisherSettings {
    pub exchange: String,
    /// Routing key; with the default exchange this is the queue name.
    pub queue: String,
    /// Registry name the publisher's channel is published under.
    pub channel_name: String,
    pub converter: ConverterKind,
}

/// Delivery-action stage settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliverySettings {
    /// Registry name of the consumer channel that issued the tags.
    pub channel_name: String,
    pub action: DeliveryAction,
}

/// Broker client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerSettings {
    /// Upper bound for every broker call (open channel, publish, ack, ...).
    pub operation_timeout_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub publisher: PublisherSettings,
    pub delivery: DeliverySettings,
    pub broker: BrokerSettings,
    pub logging: LoggingConfig,
}

impl Settings {
    /// Loads settings from defaults, an optional TOML file and `BURROW_*`
    /// environment variables (later sources win).
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }
        builder
            .add_source(env_source())
            .build()?
            .try_deserialize()
    }

    /// Parses settings from a TOML string (no environment overrides).
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}

impl BrokerSettings {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

impl Default for PublisherSettings {
    fn default() -> Self {
        Self {
            exchange: String::new(),
            queue: String::new(),
            channel_name: DEFAULT_CHANNEL_NAME.to_string(),
            converter: ConverterKind::default(),
        }
    }
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            channel_name: DEFAULT_CHANNEL_NAME.to_string(),
            action: DeliveryAction::default(),
        }
    }
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            operation_timeout_ms: 10_000,
        }
    }
}
