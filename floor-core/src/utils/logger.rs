//! Logging Infrastructure
//!
//! Structured logging setup with support for both development and production environments.
//! `RUST_LOG` overrides the configured level.

use std::path::Path;

use tracing_subscriber::EnvFilter;

/// Initialize the logger (stdout, `info`)
pub fn init_logger() -> anyhow::Result<()> {
    init_logger_with_file(None, false, None)
}

/// Initialize the logger with optional JSON format and daily-rolling file output
pub fn init_logger_with_file(
    log_level: Option<&str>,
    json: bool,
    log_dir: Option<&Path>,
) -> anyhow::Result<()> {
    let level = log_level.unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false);

    let result = match (log_dir, json) {
        (Some(dir), json) => {
            std::fs::create_dir_all(dir)?;
            let file_appender = tracing_appender::rolling::daily(dir, "floor-core");
            let builder = builder.with_ansi(false).with_writer(file_appender);
            if json {
                builder.json().try_init()
            } else {
                builder.try_init()
            }
        }
        (None, true) => builder.json().try_init(),
        (None, false) => builder.try_init(),
    };

    result.map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}
