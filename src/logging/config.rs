use std::{fs, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::LoggingError;

const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Формат вывода логов.
#[derive(Debug, Default, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

/// Настройки консольного вывода.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConsoleConfig {
    pub with_ansi: bool,
    pub with_target: bool,
    pub with_thread_ids: bool,
    pub with_line_numbers: bool,
}

/// Конфигурация логирования.
///
/// ```toml
/// [logging]
/// level = "debug"
/// format = "json"
/// file_enabled = true
/// log_dir = "logs"
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Уровень для крейта `burrow`; остальные крейты пишут от `warn`.
    pub level: String,
    pub format: LogFormat,
    pub console_enabled: bool,
    pub console: ConsoleConfig,
    /// Файловый вывод (ежедневная ротация, неблокирующая запись).
    pub file_enabled: bool,
    pub log_dir: PathBuf,
    pub filename: String,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl LoggingConfig {
    /// Директива `EnvFilter`, например `warn,burrow=info`.
    pub fn build_filter_directive(&self) -> String {
        format!("warn,burrow={}", self.level.to_ascii_lowercase())
    }

    pub fn validate(&self) -> Result<(), LoggingError> {
        if LEVELS.contains(&self.level.to_ascii_lowercase().as_str()) {
            Ok(())
        } else {
            Err(LoggingError::InvalidLevel(self.level.clone()))
        }
    }

    /// Создаёт каталог логов, если включён файловый вывод.
    pub fn ensure_log_dir(&self) -> Result<(), LoggingError> {
        if !self.file_enabled {
            return Ok(());
        }
        fs::create_dir_all(&self.log_dir).map_err(|source| LoggingError::LogDir {
            path: self.log_dir.clone(),
            source,
        })
    }
}

////////////////////////////////////////////////////////////////////////////////
// Реализации трейтов
////////////////////////////////////////////////////////////////////////////////

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            with_ansi: true,
            with_target: true,
            with_thread_ids: false,
            with_line_numbers: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
            console_enabled: true,
            console: ConsoleConfig::default(),
            file_enabled: false,
            log_dir: PathBuf::from("logs"),
            filename: "burrow.log".to_string(),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Compact);
        assert!(config.console_enabled);
        assert!(!config.file_enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_filter_directive() {
        let config = LoggingConfig {
            level: "DEBUG".into(),
            ..Default::default()
        };
        assert_eq!(config.build_filter_directive(), "warn,burrow=debug");
    }

    #[test]
    fn test_validate_rejects_unknown_level() {
        let config = LoggingConfig {
            level: "verbose".into(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(LoggingError::InvalidLevel(level)) if level == "verbose"
        ));
    }

    /// Каталог логов создаётся только при включённом файловом выводе.
    #[test]
    fn test_ensure_log_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested/logs");

        let mut config = LoggingConfig {
            log_dir: dir.clone(),
            ..Default::default()
        };
        config.ensure_log_dir().unwrap();
        assert!(!dir.exists());

        config.file_enabled = true;
        config.ensure_log_dir().unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: LoggingConfig =
            serde_json::from_str(r#"{ "format": "json", "console": { "with_ansi": false } }"#)
                .unwrap();
        assert_eq!(config.format, LogFormat::Json);
        assert!(!config.console.with_ansi);
        assert!(config.console.with_target);
        assert_eq!(config.level, "info");
    }
}
