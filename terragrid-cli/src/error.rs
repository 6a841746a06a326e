//! CLI error handling with user-friendly messages.

use std::fmt;
use std::process;

use terragrid::config::ConfigFileError;
use terragrid::error::DataError;

/// CLI errors and how to explain them.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration could not be loaded or written
    Config(String),
    /// HTTP client could not be created
    Client(DataError),
    /// Column computation failed
    Column(DataError),
}

impl CliError {
    /// Prints the error with any extra hints and exits with status 1.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Config(_) => {
                eprintln!();
                eprintln!("Check the config file (terragrid config path) or recreate it with:");
                eprintln!("  terragrid config init --force");
            }
            CliError::Column(e) if e.is_network() => {
                eprintln!();
                eprintln!("The remote dataset host could not be reached. Check [remote] index_url");
                eprintln!("and your network connection. Tiles already on disk still work offline.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Client(e) => write!(f, "Failed to create HTTP client: {}", e),
            CliError::Column(e) => write!(f, "Failed to compute column: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Client(e) | CliError::Column(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}
