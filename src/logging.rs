use file_rotate::{compression::Compression, suffix::AppendCount, ContentLimit, FileRotate};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LogConfig;
use crate::error::Result;

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Logs to stderr and to a rotating file bounded by `max_bytes` per file and
/// `max_files` rotated copies. Keep the guard alive until exit, dropping it
/// flushes the file writer.
pub fn init(config: &LogConfig) -> Result<WorkerGuard> {
    if let Some(dir) = config.path.parent() {
        std::fs::create_dir_all(dir)?;
    }

    let file = FileRotate::new(
        &config.path,
        AppendCount::new(config.max_files),
        ContentLimit::Bytes(config.max_bytes),
        Compression::None,
        #[cfg(unix)]
        None,
    );
    let (writer, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_filter(filter()))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(filter()),
        )
        .init();

    Ok(guard)
}
