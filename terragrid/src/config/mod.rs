//! User configuration.
//!
//! Settings live in an INI file at `~/.terragrid/config.ini`:
//!
//! ```ini
//! [world]
//! meters_per_block = 30
//!
//! [remote]
//! index_url = https://tiles.example.org/index.json
//! ```
//!
//! A missing file yields defaults; an invalid value is an error naming the
//! offending key.
//!
//! # Example
//!
//! ```
//! use terragrid::config::ConfigFile;
//!
//! let config = ConfigFile::default();
//! let memo = config.memo_config();
//! assert_eq!(memo.capacity, 4);
//! ```

mod defaults;
mod file;
mod parser;
mod settings;
mod writer;

pub use defaults::{
    default_cache_directory, default_log_file, DEFAULT_COLUMN_TTL_SECS, DEFAULT_MEMO_TTL_SECS,
};
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{
    CacheSettings, ConfigFile, LoggingSettings, PoolSettings, RemoteSettings, WorldSettings,
};
