use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
};

use tracing::{debug, warn};

use super::{
    BinaryConverter, Converter, ConverterResult, Decoder, Payload, PayloadKind, StringConverter,
};
use crate::error::ConversionError;

/// Префикс имени файла с выгруженной нагрузкой.
pub const DEFAULT_PREFIX: &str = "burrow-";
/// Расширение файла с выгруженной нагрузкой.
pub const DEFAULT_SUFFIX: &str = ".ser";
/// Количество случайных символов в имени файла.
const RANDOM_LEN: usize = 16;

/// Декоратор, который вместо (потенциально большой) нагрузки отправляет
/// через брокер только имя файла.
///
/// Результат вложенного конвертера записывается в новый файл с уникальным
/// именем внутри `payload_dir`, а в сообщение уходит голое имя файла (без
/// пути), закодированное как строка.
///
/// Отправитель и все получатели должны видеть один и тот же каталог:
/// это условие развёртывания, протокол его не проверяет.
#[derive(Debug, Clone)]
pub struct FileBasedConverter {
    /// Конвертер, выполняющий собственно конвертацию.
    inner: Arc<dyn Converter>,
    /// Каталог для сохранения нагрузки.
    payload_dir: PathBuf,
    prefix: String,
    suffix: String,
}

/// Обратная сторона [`FileBasedConverter`]: читает имя файла из сообщения,
/// находит файл в своей копии каталога и передаёт содержимое вложенному
/// декодеру.
#[derive(Debug, Clone)]
pub struct FileBasedDecoder {
    inner: Arc<dyn Decoder>,
    payload_dir: PathBuf,
    /// Удалять файл после успешного чтения.
    remove_after_read: bool,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl FileBasedConverter {
    pub fn new(
        inner: Arc<dyn Converter>,
        payload_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            inner,
            payload_dir: payload_dir.into(),
            prefix: DEFAULT_PREFIX.to_string(),
            suffix: DEFAULT_SUFFIX.to_string(),
        }
    }

    /// Декоратор над [`BinaryConverter`].
    pub fn binary(payload_dir: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(BinaryConverter::new()), payload_dir)
    }

    pub fn with_prefix(
        mut self,
        prefix: impl Into<String>,
    ) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_suffix(
        mut self,
        suffix: impl Into<String>,
    ) -> Self {
        self.suffix = suffix.into();
        self
    }

    pub fn payload_dir(&self) -> &Path {
        &self.payload_dir
    }

    /// Записывает данные в новый файл и возвращает его имя.
    ///
    /// Файл создаётся эксклюзивно со случайным именем, поэтому параллельные
    /// вызовы не конфликтуют. При любой ошибке до `keep()` временный файл
    /// удаляется при `Drop`.
    fn store(
        &self,
        data: &[u8],
    ) -> Result<(PathBuf, String), ConversionError> {
        let offload_err = |reason: String| ConversionError::Offload {
            path: self.payload_dir.clone(),
            reason,
        };

        if has_separator(&self.prefix) || has_separator(&self.suffix) {
            return Err(offload_err(format!(
                "prefix '{}' and suffix '{}' must not contain path separators",
                self.prefix, self.suffix
            )));
        }

        let mut file = tempfile::Builder::new()
            .prefix(&self.prefix)
            .suffix(&self.suffix)
            .rand_bytes(RANDOM_LEN)
            .tempfile_in(&self.payload_dir)
            .map_err(|e| offload_err(e.to_string()))?;

        file.write_all(data)
            .and_then(|_| file.as_file().sync_all())
            .map_err(|e| offload_err(e.to_string()))?;

        let (_, path) = file.keep().map_err(|e| offload_err(e.error.to_string()))?;

        match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => {
                let name = name.to_string();
                Ok((path, name))
            }
            None => {
                remove_quietly(&path);
                Err(offload_err(format!(
                    "generated file name is not valid UTF-8: {}",
                    path.display()
                )))
            }
        }
    }
}

impl FileBasedDecoder {
    pub fn new(
        inner: Arc<dyn Decoder>,
        payload_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            inner,
            payload_dir: payload_dir.into(),
            remove_after_read: false,
        }
    }

    pub fn remove_after_read(
        mut self,
        remove: bool,
    ) -> Self {
        self.remove_after_read = remove;
        self
    }

    pub fn payload_dir(&self) -> &Path {
        &self.payload_dir
    }
}

/// Превращает имя из сообщения в путь внутри `payload_dir`.
///
/// Принимаются только голые имена файлов: любые компоненты каталога,
/// `.` и `..` отклоняются.
pub fn resolve_reference(
    payload_dir: &Path,
    reference: &str,
) -> Result<PathBuf, ConversionError> {
    let bare = Path::new(reference)
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n == reference);

    if reference.is_empty() || !bare || has_separator(reference) {
        return Err(ConversionError::InvalidReference(reference.to_string()));
    }
    Ok(payload_dir.join(reference))
}

fn has_separator(s: &str) -> bool {
    s.contains('/') || s.contains('\\')
}

fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        warn!(path = %path.display(), error = %e, "Failed to remove payload file");
    }
}

////////////////////////////////////////////////////////////////////////////////
// Реализации трейтов
////////////////////////////////////////////////////////////////////////////////

impl Converter for FileBasedConverter {
    fn name(&self) -> &'static str {
        "file"
    }

    fn accepts(&self) -> &[PayloadKind] {
        self.inner.accepts()
    }

    fn convert(
        &self,
        payload: &Payload,
    ) -> ConverterResult {
        // Ошибка вложенного конвертера возвращается как есть, файл не создаётся.
        let data = self.inner.convert(payload)?;

        let (path, name) = self.store(&data)?;

        match StringConverter::new().convert(&Payload::Text(name)) {
            Ok(reference) => {
                debug!(
                    path = %path.display(),
                    bytes = data.len(),
                    "Payload offloaded to shared directory"
                );
                Ok(reference)
            }
            Err(e) => {
                remove_quietly(&path);
                Err(e)
            }
        }
    }

    /// Удаляет файл, на который указывает `output`, и откатывает результат
    /// вложенного конвертера (для вложенных декораторов это их файлы).
    fn discard(
        &self,
        output: &[u8],
    ) {
        let Some(path) = std::str::from_utf8(output)
            .ok()
            .and_then(|reference| resolve_reference(&self.payload_dir, reference).ok())
        else {
            warn!(dir = %self.payload_dir.display(), "Discarded output is not a payload file name");
            return;
        };

        match fs::read(&path) {
            Ok(data) => self.inner.discard(&data),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to read payload file"),
        }
        remove_quietly(&path);
        debug!(path = %path.display(), "Unsent payload file removed");
    }

    fn inner(&self) -> Option<&dyn Converter> {
        Some(self.inner.as_ref())
    }
}

impl Decoder for FileBasedDecoder {
    fn decode(
        &self,
        bytes: &[u8],
    ) -> Result<Payload, ConversionError> {
        let reference = String::from_utf8(bytes.to_vec())?;
        let path = resolve_reference(&self.payload_dir, &reference)?;

        let data = fs::read(&path).map_err(|e| {
            ConversionError::InvalidReference(format!("{}: {e}", path.display()))
        })?;
        let payload = self.inner.decode(&data)?;

        if self.remove_after_read {
            remove_quietly(&path);
        }
        Ok(payload)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn count_files(dir: &Path) -> usize {
        fs::read_dir(dir).unwrap().count()
    }

    /// Вместо нагрузки возвращается имя файла, а в файле лежат байты
    /// вложенного конвертера.
    #[test]
    fn test_returns_filename_not_payload() {
        let dir = tempfile::tempdir().unwrap();
        let conv = FileBasedConverter::new(Arc::new(StringConverter::new()), dir.path());

        let out = conv.convert(&Payload::from("hello")).unwrap();
        let name = String::from_utf8(out).unwrap();

        assert_ne!(name, "hello");
        assert!(name.starts_with(DEFAULT_PREFIX));
        assert!(name.ends_with(DEFAULT_SUFFIX));
        assert!(!name.contains('/'));
        assert_eq!(fs::read(dir.path().join(&name)).unwrap(), b"hello");
    }

    /// Ошибка вложенного конвертера передаётся без изменений,
    /// и каталог остаётся пустым.
    #[test]
    fn test_inner_failure_creates_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let inner = StringConverter::new();
        let conv = FileBasedConverter::new(Arc::new(inner), dir.path());

        let payload = Payload::from(17i64);
        let expected = inner.convert(&payload).unwrap_err();
        let err = conv.convert(&payload).unwrap_err();

        assert_eq!(err, expected);
        assert_eq!(err.to_string(), expected.to_string());
        assert_eq!(count_files(dir.path()), 0);
    }

    /// Несуществующий каталог даёт ошибку выгрузки.
    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let conv = FileBasedConverter::binary(&missing);

        let err = conv.convert(&Payload::from("x")).unwrap_err();
        assert!(matches!(err, ConversionError::Offload { .. }));
    }

    /// Разделитель пути в префиксе запрещён: имя должно остаться голым.
    #[test]
    fn test_prefix_with_separator_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let conv = FileBasedConverter::binary(dir.path()).with_prefix("../evil-");

        assert!(conv.convert(&Payload::from("x")).is_err());
        assert_eq!(count_files(dir.path()), 0);
    }

    #[test]
    fn test_custom_prefix_and_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let conv = FileBasedConverter::binary(dir.path())
            .with_prefix("rabbitmq-")
            .with_suffix(".bin");

        let name = String::from_utf8(conv.convert(&Payload::Null).unwrap()).unwrap();
        assert!(name.starts_with("rabbitmq-"));
        assert!(name.ends_with(".bin"));
    }

    /// Последовательные вызовы с одинаковой нагрузкой дают разные файлы.
    #[test]
    fn test_names_unique_sequential() {
        let dir = tempfile::tempdir().unwrap();
        let conv = FileBasedConverter::binary(dir.path());

        let names: HashSet<Vec<u8>> = (0..50)
            .map(|_| conv.convert(&Payload::from("same")).unwrap())
            .collect();
        assert_eq!(names.len(), 50);
        assert_eq!(count_files(dir.path()), 50);
    }

    /// Декоратор над декоратором: внешний файл содержит имя внутреннего.
    #[test]
    fn test_nested_decorators_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let inner = Arc::new(FileBasedConverter::new(
            Arc::new(StringConverter::new()),
            dir.path(),
        ));
        let outer = FileBasedConverter::new(inner, dir.path());

        let message = outer.convert(&Payload::from("deep")).unwrap();
        assert_eq!(count_files(dir.path()), 2);

        let decoder = FileBasedDecoder::new(
            Arc::new(FileBasedDecoder::new(
                Arc::new(StringConverter::new()),
                dir.path(),
            )),
            dir.path(),
        );
        assert_eq!(decoder.decode(&message).unwrap(), Payload::from("deep"));
    }

    /// Откат неотправленного результата удаляет файлы всех уровней цепочки.
    #[test]
    fn test_discard_removes_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        let inner = Arc::new(FileBasedConverter::new(
            Arc::new(StringConverter::new()),
            dir.path(),
        ));
        let outer = FileBasedConverter::new(inner, dir.path());

        let message = outer.convert(&Payload::from("unsent")).unwrap();
        assert_eq!(count_files(dir.path()), 2);

        outer.discard(&message);
        assert_eq!(count_files(dir.path()), 0);
    }

    /// Мусор вместо имени файла не трогает каталог.
    #[test]
    fn test_discard_ignores_invalid_reference() {
        let dir = tempfile::tempdir().unwrap();
        let conv = FileBasedConverter::binary(dir.path());
        let kept = conv.convert(&Payload::Null).unwrap();

        conv.discard(b"../outside.ser");
        conv.discard(&[0xff, 0xfe]);
        assert_eq!(count_files(dir.path()), 1);
        assert!(dir.path().join(String::from_utf8(kept).unwrap()).is_file());
    }

    #[test]
    fn test_decoder_removes_file_when_asked() {
        let dir = tempfile::tempdir().unwrap();
        let conv = FileBasedConverter::binary(dir.path());
        let message = conv.convert(&Payload::from(5i64)).unwrap();

        let decoder =
            FileBasedDecoder::new(Arc::new(BinaryConverter::new()), dir.path()).remove_after_read(true);
        assert_eq!(decoder.decode(&message).unwrap(), Payload::from(5i64));
        assert_eq!(count_files(dir.path()), 0);
    }

    #[test]
    fn test_resolve_reference_rejects_paths() {
        let dir = Path::new("/srv/payloads");
        assert!(resolve_reference(dir, "burrow-abc.ser").is_ok());
        assert!(resolve_reference(dir, "").is_err());
        assert!(resolve_reference(dir, "..").is_err());
        assert!(resolve_reference(dir, "../etc/passwd").is_err());
        assert!(resolve_reference(dir, "/etc/passwd").is_err());
        assert!(resolve_reference(dir, "sub/file.ser").is_err());
    }

    #[test]
    fn test_decoder_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let decoder = FileBasedDecoder::new(Arc::new(StringConverter::new()), dir.path());
        let err = decoder.decode(b"burrow-missing.ser").unwrap_err();
        assert!(matches!(err, ConversionError::InvalidReference(_)));
    }
}
