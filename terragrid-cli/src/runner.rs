//! CLI runner for common setup.
//!
//! Loads the configuration and installs logging before a command runs.

use tracing::info;

use terragrid::config::ConfigFile;
use terragrid::logging::{init_logging, split_log_path, LoggingGuard};

use crate::error::CliError;

/// Holds the loaded configuration and keeps logging alive for the command.
pub struct CliRunner {
    _logging_guard: LoggingGuard,
    config: ConfigFile,
}

impl CliRunner {
    /// Loads the config file (defaults if absent) and initializes logging at
    /// the path it names.
    pub fn new() -> Result<Self, CliError> {
        let config = ConfigFile::load()?;

        let (log_dir, log_file) = split_log_path(&config.logging.file);
        let logging_guard =
            init_logging(log_dir, log_file).map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            _logging_guard: logging_guard,
            config,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn log_startup(&self, command: &str) {
        info!("terragrid v{}", terragrid::VERSION);
        info!("terragrid CLI: {} command", command);
    }
}
