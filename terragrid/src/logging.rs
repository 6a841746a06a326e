//! Logging setup.
//!
//! Installs a `tracing` subscriber writing to a per-session log file (cleared
//! on start) and to stdout. The level defaults to `info` and can be
//! overridden with `RUST_LOG`, e.g. `RUST_LOG=terragrid::source=debug`.

use std::fs;
use std::io;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Default log file name.
pub const DEFAULT_LOG_FILE: &str = "terragrid.log";

/// Keeps the file writer alive. Dropping it flushes and closes the log.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Initializes logging to `log_dir/log_file` and stdout.
///
/// Creates the directory if needed and truncates any previous log.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be created.
pub fn init_logging(log_dir: &Path, log_file: &str) -> Result<LoggingGuard, io::Error> {
    let (non_blocking_file, file_guard) = prepare_log_file(log_dir, log_file)?;

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_target(true);

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .with_ansi(true)
        .compact();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// Creates and truncates the log file and returns its non-blocking writer.
fn prepare_log_file(
    log_dir: &Path,
    log_file: &str,
) -> Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard), io::Error> {
    fs::create_dir_all(log_dir)?;
    fs::write(log_dir.join(log_file), "")?;

    let appender = tracing_appender::rolling::never(log_dir, log_file);
    Ok(tracing_appender::non_blocking(appender))
}

/// Splits a log file path into the directory and file name `init_logging`
/// expects, defaulting the name to [`DEFAULT_LOG_FILE`].
pub fn split_log_path(path: &Path) -> (&Path, &str) {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let file = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(DEFAULT_LOG_FILE);
    (dir, file)
}
