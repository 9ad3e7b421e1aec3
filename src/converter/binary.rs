use tracing::trace;

use super::{Converter, ConverterResult, Decoder, Payload, PayloadKind};
use crate::error::ConversionError;

/// Сериализует произвольную нагрузку в бинарный вид (bincode).
///
/// Строки и последовательности кодируются с префиксом длины, варианты
/// `Payload` числовым тегом, поэтому получатель восстанавливает точно
/// тот же `Payload`, включая вложенные списки и словари.
#[derive(Debug, Default, Clone, Copy)]
pub struct BinaryConverter;

impl BinaryConverter {
    pub fn new() -> Self {
        Self
    }
}

impl Converter for BinaryConverter {
    fn name(&self) -> &'static str {
        "binary"
    }

    fn accepts(&self) -> &[PayloadKind] {
        PayloadKind::ALL
    }

    fn convert(
        &self,
        payload: &Payload,
    ) -> ConverterResult {
        let bytes = bincode::serialize(payload)
            .map_err(|e| ConversionError::Serialization(e.to_string()))?;
        trace!(kind = %payload.kind(), len = bytes.len(), "Binary payload encoded");
        Ok(bytes)
    }
}

impl Decoder for BinaryConverter {
    fn decode(
        &self,
        bytes: &[u8],
    ) -> Result<Payload, ConversionError> {
        bincode::deserialize(bytes).map_err(|e| ConversionError::Deserialization(e.to_string()))
    }
}
