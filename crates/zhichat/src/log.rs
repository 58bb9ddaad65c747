//! Logging for zhichat.
use anyhow::Context;
use std::io::LineWriter;
use std::sync::Mutex;
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use zhichat_core::get_data_dir;

const MAX_LOG_SIZE: u64 = 100 * 1024;

/// Initializes file based logging for the terminal chat.
///
/// The terminal is the chat surface, so logs go to `<data_dir>/zhichat.log`.
/// A log file larger than 100KB is moved to `zhichat.log.old` first.
///
/// # Errors
///
/// Fails when the data directory or log file cannot be created, or when the
/// local time offset cannot be determined.
pub fn setup_logging() -> anyhow::Result<()> {
    let data_dir = get_data_dir().context("Failed to get data directory")?;
    let log_path = data_dir.join("zhichat.log");

    if log_path.exists() {
        let metadata = std::fs::metadata(&log_path)?;
        if metadata.len() > MAX_LOG_SIZE {
            let backup_path = data_dir.join("zhichat.log.old");
            if backup_path.exists() {
                std::fs::remove_file(&backup_path)?;
            }
            std::fs::rename(&log_path, backup_path)?;
        }
    }

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;

    // Ensure the logs are flushed after every line
    let writer = Mutex::new(LineWriter::new(log_file));

    tracing_subscriber::fmt()
        .with_env_filter("zhichat=debug,zhichat_core=debug,rustyline=info")
        .with_writer(writer)
        .with_ansi(false)
        .with_timer(OffsetTime::local_rfc_3339()?)
        .init();
    Ok(())
}

/// Initializes stderr logging for the web server, honoring `RUST_LOG`.
pub fn setup_server_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            // axum logs rejections from built-in extractors at TRACE level
            "zhichat=debug,zhichat_core=debug,tower_http=debug,axum::rejection=trace".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
