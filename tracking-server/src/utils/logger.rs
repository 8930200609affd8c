//! Logging Infrastructure
//!
//! `RUST_LOG` wins over the configured level. JSON output is meant for
//! production log shipping; a daily rolling file is added when the log
//! directory exists.

use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Initialize the logger with the configured level
pub fn init_logger() {
    init_logger_with_file(None, false, None);
}

/// Initialize the logger with optional JSON formatting and file output
pub fn init_logger_with_file(log_level: Option<&str>, json: bool, log_dir: Option<&str>) {
    let level = log_level.unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false);

    let file_appender = log_dir
        .map(Path::new)
        .filter(|path| path.is_dir())
        .map(|path| tracing_appender::rolling::daily(path, "tracking-server"));

    match (json, file_appender) {
        (true, Some(writer)) => subscriber.json().with_writer(writer).init(),
        (true, None) => subscriber.json().init(),
        (false, Some(writer)) => subscriber.with_ansi(false).with_writer(writer).init(),
        (false, None) => subscriber.init(),
    }
}
