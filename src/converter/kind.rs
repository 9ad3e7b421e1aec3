use std::{path::PathBuf, sync::Arc};

use serde::{Deserialize, Serialize};

use super::{BinaryConverter, Converter, Decoder, FileBasedConverter, FileBasedDecoder, StringConverter};

/// Declarative description of a converter chain, as found in configuration.
///
/// ```toml
/// [publisher.converter]
/// type = "file"
/// payload_dir = "/srv/payloads"
/// inner = { type = "string" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ConverterKind {
    #[default]
    String,
    Binary,
    File {
        #[serde(default = "default_file_inner")]
        inner: Box<ConverterKind>,
        payload_dir: PathBuf,
    },
}

fn default_file_inner() -> Box<ConverterKind> {
    Box::new(ConverterKind::Binary)
}

impl ConverterKind {
    /// Builds the sending side of the chain.
    pub fn build(&self) -> Arc<dyn Converter> {
        match self {
            ConverterKind::String => Arc::new(StringConverter::new()),
            ConverterKind::Binary => Arc::new(BinaryConverter::new()),
            ConverterKind::File { inner, payload_dir } => {
                Arc::new(FileBasedConverter::new(inner.build(), payload_dir.clone()))
            }
        }
    }

    /// Builds the matching receiving side of the chain.
    pub fn build_decoder(&self) -> Arc<dyn Decoder> {
        match self {
            ConverterKind::String => Arc::new(StringConverter::new()),
            ConverterKind::Binary => Arc::new(BinaryConverter::new()),
            ConverterKind::File { inner, payload_dir } => Arc::new(FileBasedDecoder::new(
                inner.build_decoder(),
                payload_dir.clone(),
            )),
        }
    }
}
