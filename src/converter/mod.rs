//! Цепочка конвертеров: превращает токен конвейера в байты для брокера.
//!
//! - `string`: текст → UTF-8 (конвертер по умолчанию).
//! - `binary`: произвольный структурированный `Payload` → bincode.
//! - `file`: декоратор, который сохраняет результат вложенного конвертера
//!   в общий каталог и отправляет только имя файла.
//! - `kind`: описание цепочки в конфигурации.
//!
//! Для каждой отправляющей стороны есть обратная операция [`Decoder`],
//! которой пользуется получатель.

pub mod binary;
pub mod file;
pub mod kind;
pub mod payload;
pub mod string;

use std::fmt;

pub use binary::BinaryConverter;
pub use file::{FileBasedConverter, FileBasedDecoder};
pub use kind::ConverterKind;
pub use payload::{Payload, PayloadKind};
pub use string::StringConverter;

use crate::error::ConversionError;

/// Результат одной конвертации: байты либо ошибка, но не оба сразу.
pub type ConverterResult = Result<Vec<u8>, ConversionError>;

/// Конвертер полезной нагрузки в байты.
///
/// Декораторы хранят ссылку на вложенный конвертер и не полагаются на его
/// конкретный тип: им достаточно `convert`.
pub trait Converter: Send + Sync + fmt::Debug {
    /// Короткое имя для логов и `quick_info`.
    fn name(&self) -> &'static str;

    /// Виды нагрузки, которые конвертер принимает.
    fn accepts(&self) -> &[PayloadKind];

    /// Конвертирует нагрузку в байты.
    fn convert(
        &self,
        payload: &Payload,
    ) -> ConverterResult;

    /// Откатывает побочные эффекты `convert` для результата, который так и
    /// не был отправлен. У конвертеров без побочных эффектов ничего не делает.
    fn discard(
        &self,
        _output: &[u8],
    ) {
    }

    /// Вложенный конвертер, если это декоратор.
    fn inner(&self) -> Option<&dyn Converter> {
        None
    }

    /// Краткое описание цепочки, например `file(binary)`.
    fn quick_info(&self) -> String {
        match self.inner() {
            Some(inner) => format!("{}({})", self.name(), inner.quick_info()),
            None => self.name().to_string(),
        }
    }
}

/// Обратная операция для получателя: байты сообщения → нагрузка.
pub trait Decoder: Send + Sync + fmt::Debug {
    fn decode(
        &self,
        bytes: &[u8],
    ) -> Result<Payload, ConversionError>;
}
