use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initializes the logging system with both console and file output.
///
/// Console lines are human readable; the daily-rotated file under `log_dir`
/// gets JSON records. The returned guard flushes the file writer on drop, so
/// hold it for the lifetime of the process.
pub fn init_logging(log_dir: &str) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("dbms_browser=info,tower_http=info"));

    if fs::create_dir_all(log_dir).is_err() {
        // Fall back to console only when the log directory is not writable
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stdout))
            .try_init();
        return None;
    }

    let file_appender = tracing_appender::rolling::daily(log_dir, "dbms_browser.log");
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = fmt::layer().json().with_writer(non_blocking_writer);
    let console_layer = fmt::layer().with_writer(std::io::stdout);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    Some(guard)
}
