use std::path::PathBuf;

use thiserror::Error;

use crate::converter::PayloadKind;

/// Errors produced while turning a payload into bytes (or back).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("{converter} converter does not accept {kind} payloads")]
    UnsupportedPayload {
        converter: &'static str,
        kind: PayloadKind,
    },

    #[error("failed to serialize payload: {0}")]
    Serialization(String),

    #[error("failed to deserialize payload: {0}")]
    Deserialization(String),

    #[error("failed to store payload in {}: {reason}", path.display())]
    Offload { path: PathBuf, reason: String },

    #[error("invalid payload reference: {0}")]
    InvalidReference(String),

    #[error("payload is not valid UTF-8: {0}")]
    Utf8(String),
}

impl From<std::string::FromUtf8Error> for ConversionError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        ConversionError::Utf8(err.to_string())
    }
}
