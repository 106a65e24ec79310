//! Logging setup for Swap Monitor.
//!
//! Output always goes to stdout. With `[logging] file` set it is also
//! appended to that file, so restarts keep earlier history.

use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::Arc;

use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::Result;

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// `RUST_LOG` directives plus the configured level.
fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::from_default_env().add_directive(parse_level(level).into())
}

/// Open `path` for appending, creating missing parent directories.
fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

/// Install the global subscriber described by `config`.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let Some(path) = config.file.as_deref() else {
        init_console_only(&config.level);
        return Ok(());
    };

    let log_file = Arc::new(open_log_file(Path::new(path))?);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout.and(log_file))
                .with_ansi(false)
                .with_target(true),
        )
        .with(env_filter(&config.level))
        .init();

    Ok(())
}

/// Install a stdout-only subscriber.
pub fn init_console_only(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_target(true),
        )
        .with(env_filter(level))
        .init();
}
