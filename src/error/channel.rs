use thiserror::Error;

use super::BrokerClientError;

/// Errors related to channel lookup and lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// Named channel is missing from the registry or already closed.
    #[error("channel unavailable: '{name}'")]
    Unavailable { name: String },

    #[error("broker connection unavailable")]
    ConnectionUnavailable,

    #[error("failed to create channel '{name}': {source}")]
    Creation {
        name: String,
        #[source]
        source: BrokerClientError,
    },

    /// The broker refused an operation on an open channel.
    #[error("operation on channel '{name}' failed: {source}")]
    Operation {
        name: String,
        #[source]
        source: BrokerClientError,
    },
}

impl ChannelError {
    pub fn unavailable(name: impl Into<String>) -> Self {
        ChannelError::Unavailable { name: name.into() }
    }

    /// `true` for failures caused by a missing or closed channel.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            ChannelError::Unavailable { .. } | ChannelError::ConnectionUnavailable
        )
    }
}
