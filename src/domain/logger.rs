//! Logging system with daily rotation.

use anyhow::Result;
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};
use time::macros::format_description;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt;
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

const LOG_PREFIX: &str = "chat-warden";

/// Initialize the logging system.
///
/// Always logs to a daily file in `config.log_path`; `stderr` additionally
/// receives the same events when `stderr` is set.
pub fn init(config: &Config, stderr: bool) -> Result<()> {
    // Create log directory if needed
    if !config.log_path.exists() {
        fs::create_dir_all(&config.log_path)?;
    }

    // Clean up old logs
    cleanup_old_logs(&config.log_path, config.log_retention_days)?;

    // Rolling file appender with daily rotation
    let file_appender = RollingFileAppender::new(Rotation::DAILY, &config.log_path, LOG_PREFIX);

    // Use local timezone for timestamps
    let time_format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let local_offset = time::UtcOffset::current_local_offset().unwrap_or(time::UtcOffset::UTC);
    let timer = OffsetTime::new(local_offset, time_format);

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = stderr.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_timer(timer.clone())
    });

    // File output always, stderr on request
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true)
                .with_timer(timer),
        )
        .with(stderr_layer);

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set global subscriber: {}", e))?;

    Ok(())
}

/// Remove log files older than `retention_days`.
pub fn cleanup_old_logs(log_path: &Path, retention_days: u64) -> Result<()> {
    let retention = Duration::from_secs(retention_days * 24 * 60 * 60);
    let Some(cutoff) = SystemTime::now().checked_sub(retention) else {
        return Ok(());
    };

    if !log_path.exists() {
        return Ok(());
    }

    for entry in fs::read_dir(log_path)? {
        let entry = entry?;
        let path = entry.path();

        // Only process log files
        if !path.is_file() {
            continue;
        }

        let filename = match path.file_name().and_then(|n| n.to_str()) {
            Some(n) => n,
            None => continue,
        };

        // Skip files that aren't ours
        if !filename.starts_with(LOG_PREFIX) {
            continue;
        }

        // Check modification time
        if let Ok(metadata) = entry.metadata() {
            if let Ok(modified) = metadata.modified() {
                if modified < cutoff {
                    let _ = fs::remove_file(&path);
                }
            }
        }
    }

    Ok(())
}
