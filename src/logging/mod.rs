pub mod config;
mod filters;
mod formatter;
pub mod handle;

pub use config::{ConsoleConfig, LogFormat, LoggingConfig};
pub use handle::LoggingHandle;

use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::LoggingError;

/// Инициализация логирования с конфигурацией.
///
/// `RUST_LOG` имеет приоритет над `config.level`. Файловый вывод пишет в
/// `log_dir/filename` с ежедневной ротацией через неблокирующий writer;
/// возвращённый handle нужно держать до конца работы процесса.
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingHandle, LoggingError> {
    config.validate()?;
    config.ensure_log_dir()?;

    let env_filter = filters::build_filter_from_config(config);
    let mut layers = Vec::new();

    if config.console_enabled {
        layers.push(formatter::build_layer(
            config.format,
            std::io::stdout,
            config.console.with_ansi,
            &config.console,
        ));
    }

    let file_guard = if config.file_enabled {
        let appender = rolling::daily(&config.log_dir, &config.filename);
        let (writer, guard) = non_blocking(appender);
        layers.push(formatter::build_layer(
            config.format,
            writer,
            false,
            &config.console,
        ));
        Some(guard)
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        log_level = %config.level,
        format = ?config.format,
        console_enabled = config.console_enabled,
        file_enabled = config.file_enabled,
        "Logging system initialized"
    );

    Ok(LoggingHandle::new(file_guard))
}
