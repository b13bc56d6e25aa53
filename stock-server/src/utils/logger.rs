//! Logging Infrastructure
//!
//! `RUST_LOG` wins when set; otherwise the configured level applies to the
//! whole process. Drift warnings go to the `ledger_drift` target and
//! authentication failures to `security`, so both can be filtered
//! independently (`RUST_LOG=info,ledger_drift=warn`).

use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Initialize the logger with stdout output
pub fn init_logger() {
    init_logger_with_file(None, None);
}

/// Initialize the logger with optional daily rolling file output
///
/// File output is only enabled when `log_dir` already exists.
pub fn init_logger_with_file(log_level: Option<&str>, log_dir: Option<&str>) {
    let level = log_level.unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(true);

    if let Some(dir) = log_dir {
        let log_path = Path::new(dir);
        if log_path.is_dir() {
            let file_appender = tracing_appender::rolling::daily(log_path, "stock-server");
            let result = subscriber
                .with_ansi(false)
                .with_writer(file_appender)
                .try_init();
            if result.is_err() {
                eprintln!("Logger already initialized");
            }
            return;
        }
    }

    if subscriber.try_init().is_err() {
        eprintln!("Logger already initialized");
    }
}
