use tracing_subscriber::EnvFilter;

use crate::logging::config::LoggingConfig;

/// Фильтр из `RUST_LOG`, если переменная задана, иначе из конфигурации.
pub fn build_filter_from_config(config: &LoggingConfig) -> EnvFilter {
    let directive = config.build_filter_directive();

    match EnvFilter::try_from_default_env() {
        Ok(env_filter) => env_filter,
        Err(_) => match EnvFilter::try_new(&directive) {
            Ok(filter) => filter,
            Err(e) => {
                eprintln!(
                    "Invalid log filter directive from config ('{directive}'): {e}; falling back to 'info'"
                );
                EnvFilter::new("info")
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use std::{
        env,
        sync::{Arc, Mutex},
    };

    use serial_test::serial;
    use tracing_subscriber::{fmt, prelude::*, registry::Registry};

    use super::*;

    struct VecMakeWriter(Arc<Mutex<Vec<u8>>>);

    impl<'a> fmt::MakeWriter<'a> for VecMakeWriter {
        type Writer = VecWriterGuard;

        fn make_writer(&'a self) -> Self::Writer {
            VecWriterGuard(self.0.clone())
        }
    }

    struct VecWriterGuard(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for VecWriterGuard {
        fn write(
            &mut self,
            buf: &[u8],
        ) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Без `RUST_LOG` фильтр берётся из конфигурации: `info` от burrow
    /// проходит, `debug` нет.
    #[test]
    #[serial]
    fn test_filter_from_config_levels() {
        env::remove_var("RUST_LOG");
        let filter = build_filter_from_config(&LoggingConfig::default());

        let buffer = Arc::new(Mutex::new(Vec::new()));
        let layer = fmt::layer()
            .with_writer(VecMakeWriter(buffer.clone()))
            .with_filter(filter);
        let subscriber = Registry::default().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: "burrow::publisher", "published token");
            tracing::debug!(target: "burrow::publisher", "routine detail");
            tracing::info!(target: "other_crate", "foreign info");
        });

        let out = buffer.lock().unwrap();
        let s = String::from_utf8_lossy(&out);
        assert!(s.contains("published token"));
        assert!(!s.contains("routine detail"));
        assert!(!s.contains("foreign info"));
    }

    /// Некорректная директива из конфигурации не приводит к панике.
    #[test]
    #[serial]
    fn test_invalid_directive_falls_back() {
        env::remove_var("RUST_LOG");
        let config = LoggingConfig {
            level: "info,[".into(),
            ..Default::default()
        };
        let _filter = build_filter_from_config(&config);
    }

    #[test]
    #[serial]
    fn test_rust_log_overrides_config() {
        env::set_var("RUST_LOG", "trace");
        let filter = build_filter_from_config(&LoggingConfig::default());
        env::remove_var("RUST_LOG");
        assert!(filter.to_string().contains("trace"));
    }
}
