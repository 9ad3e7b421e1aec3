use tracing::trace;

use super::{Converter, ConverterResult, Decoder, Payload, PayloadKind};
use crate::error::ConversionError;

/// Кодирует текстовую нагрузку в UTF-8.
///
/// Конвертер по умолчанию: принимает только `Payload::Text`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StringConverter;

impl StringConverter {
    pub fn new() -> Self {
        Self
    }
}

impl Converter for StringConverter {
    fn name(&self) -> &'static str {
        "string"
    }

    fn accepts(&self) -> &[PayloadKind] {
        &[PayloadKind::Text]
    }

    fn convert(
        &self,
        payload: &Payload,
    ) -> ConverterResult {
        match payload {
            Payload::Text(text) => {
                trace!(len = text.len(), "String payload encoded");
                Ok(text.as_bytes().to_vec())
            }
            other => Err(ConversionError::UnsupportedPayload {
                converter: self.name(),
                kind: other.kind(),
            }),
        }
    }
}

impl Decoder for StringConverter {
    fn decode(
        &self,
        bytes: &[u8],
    ) -> Result<Payload, ConversionError> {
        Ok(Payload::Text(String::from_utf8(bytes.to_vec())?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Текст кодируется как есть, без служебных префиксов.
    #[test]
    fn test_convert_text() {
        let bytes = StringConverter::new().convert(&Payload::from("hello")).unwrap();
        assert_eq!(bytes, b"hello");
    }

    /// Пустая строка допустима и даёт пустое тело сообщения.
    #[test]
    fn test_convert_empty_text() {
        let bytes = StringConverter::new().convert(&Payload::from("")).unwrap();
        assert!(bytes.is_empty());
    }

    /// Не-текстовая нагрузка отклоняется с понятным сообщением.
    #[test]
    fn test_rejects_non_text() {
        let err = StringConverter::new()
            .convert(&Payload::from(vec![0u8, 1]))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "string converter does not accept bytes payloads"
        );
    }

    /// Декодирование отклоняет невалидный UTF-8.
    #[test]
    fn test_decode_invalid_utf8() {
        let err = StringConverter::new().decode(&[0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, ConversionError::Utf8(_)));
    }

    #[test]
    fn test_decode_text() {
        let payload = StringConverter::new().decode("привет".as_bytes()).unwrap();
        assert_eq!(payload, Payload::from("привет"));
    }
}
