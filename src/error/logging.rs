use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while setting up logging.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log level '{0}', expected one of: trace, debug, info, warn, error")]
    InvalidLevel(String),

    #[error("failed to create log directory {path}: {source}")]
    LogDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to install global subscriber: {0}")]
    Init(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_level_display() {
        let msg = LoggingError::InvalidLevel("loud".into()).to_string();
        assert!(msg.starts_with("invalid log level 'loud'"));
    }
}
