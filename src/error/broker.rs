use std::time::Duration;

use thiserror::Error;

/// Errors reported by a broker client (connection or channel level).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerClientError {
    #[error("connection is closed")]
    ConnectionClosed,

    #[error("channel {0} is closed")]
    ChannelClosed(u16),

    #[error("NOT_FOUND - {0}")]
    NotFound(String),

    #[error("PRECONDITION_FAILED - {0}")]
    PreconditionFailed(String),

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for BrokerClientError {
    fn from(err: std::io::Error) -> Self {
        BrokerClientError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broker_error_display() {
        assert_eq!(
            BrokerClientError::PreconditionFailed("unknown delivery tag 7".into()).to_string(),
            "PRECONDITION_FAILED - unknown delivery tag 7"
        );
        assert_eq!(
            BrokerClientError::ChannelClosed(3).to_string(),
            "channel 3 is closed"
        );
    }

    #[test]
    fn test_io_conversion() {
        let err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe gone");
        let converted: BrokerClientError = err.into();
        assert_eq!(converted, BrokerClientError::Io("pipe gone".into()));
    }
}
