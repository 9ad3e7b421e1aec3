use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use tracing_appender::non_blocking::WorkerGuard;

/// Handle для управления жизненным циклом логирования.
///
/// Держит `WorkerGuard` файлового writer'а: пока handle жив, фоновый поток
/// дописывает буфер на диск.
pub struct LoggingHandle {
    file_guard: Option<WorkerGuard>,
    shutdown_in_progress: Arc<AtomicBool>,
    flush_timeout: Duration,
}

impl LoggingHandle {
    pub fn new(file_guard: Option<WorkerGuard>) -> Self {
        Self {
            file_guard,
            shutdown_in_progress: Arc::new(AtomicBool::new(false)),
            flush_timeout: Duration::from_secs(5),
        }
    }

    /// Устанавливает таймаут, после которого медленный shutdown
    /// сообщается в stderr.
    pub fn with_flush_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.flush_timeout = timeout;
        self
    }

    /// `true`, если включён файловый вывод.
    pub fn has_file_sink(&self) -> bool {
        self.file_guard.is_some()
    }

    pub fn is_shutdown_in_progress(&self) -> bool {
        self.shutdown_in_progress.load(Ordering::Acquire)
    }

    /// Корректное завершение: сбрасывает буфер файлового writer'а.
    pub fn shutdown(mut self) {
        self.shutdown_in_progress.store(true, Ordering::Release);
        tracing::info!(
            timeout_secs = self.flush_timeout.as_secs(),
            "Initiating logging shutdown"
        );

        let start = Instant::now();
        drop(self.file_guard.take());
        let elapsed = start.elapsed();

        if elapsed > self.flush_timeout {
            eprintln!(
                "WARNING: Logging shutdown took {}ms (timeout: {}ms)",
                elapsed.as_millis(),
                self.flush_timeout.as_millis()
            );
        }
    }
}

impl Drop for LoggingHandle {
    fn drop(&mut self) {
        if self.file_guard.is_some() && !self.is_shutdown_in_progress() {
            eprintln!(
                "WARNING: LoggingHandle dropped without explicit shutdown(). \
                 Some logs may be lost."
            )
        }
    }
}
