//! Logging Infrastructure
//!
//! `RUST_LOG` wins over the configured level when set. With a log
//! directory the output goes to a daily rolling file instead of stdout.

use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing_subscriber::EnvFilter;

/// File name prefix of rolled log files
pub const LOG_FILE_PREFIX: &str = "dine-server";

/// Initialize the logger
pub fn init_logger() {
    init_logger_with_file(None, None);
}

/// Initialize the logger with optional file output
pub fn init_logger_with_file(log_level: Option<&str>, log_dir: Option<&str>) {
    let level = log_level.unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false);

    if let Some(dir) = log_dir {
        let log_path = Path::new(dir);
        if log_path.exists()
            && let Some(dir_str) = log_path.to_str()
        {
            let file_appender = tracing_appender::rolling::daily(dir_str, LOG_FILE_PREFIX);
            subscriber.with_ansi(false).with_writer(file_appender).init();
            return;
        }
    }

    subscriber.init();
}

/// Delete rolled log files older than `days`; returns how many were removed
pub fn cleanup_old_logs(log_dir: &str, days: u64) -> std::io::Result<usize> {
    let dir = Path::new(log_dir);
    if !dir.exists() {
        return Ok(0);
    }

    let max_age = Duration::from_secs(days * 24 * 60 * 60);
    let now = SystemTime::now();
    let mut removed = 0;

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if !name.to_string_lossy().starts_with(LOG_FILE_PREFIX) {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        let expired = now
            .duration_since(modified)
            .is_ok_and(|age| age > max_age);
        if expired {
            std::fs::remove_file(entry.path())?;
            removed += 1;
        }
    }

    if removed > 0 {
        tracing::info!(removed, log_dir, "Old log files cleaned up");
    }
    Ok(removed)
}
