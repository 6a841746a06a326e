//! Default values for every configuration setting.

use std::path::PathBuf;

use super::file::config_directory;
use super::settings::*;
use crate::column::{DEFAULT_COLUMN_CAPACITY, DEFAULT_COLUMN_TTL};
use crate::dataop::{default_worker_count, DEFAULT_MEMO_CAPACITY, DEFAULT_MEMO_TTL};
use crate::source::http::DEFAULT_TIMEOUT_SECS;
use crate::source::DEFAULT_USER_AGENT;
use crate::world::DEFAULT_METERS_PER_BLOCK;

pub const DEFAULT_MEMO_TTL_SECS: u64 = DEFAULT_MEMO_TTL.as_secs();
pub const DEFAULT_COLUMN_TTL_SECS: u64 = DEFAULT_COLUMN_TTL.as_secs();

/// Default disk tile cache root (platform cache dir, e.g. ~/.cache/terragrid).
pub fn default_cache_directory() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| config_directory().join("cache"))
        .join("terragrid")
}

/// Default log file (~/.terragrid/terragrid.log).
pub fn default_log_file() -> PathBuf {
    config_directory().join("terragrid.log")
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            world: WorldSettings {
                meters_per_block: DEFAULT_METERS_PER_BLOCK,
            },
            cache: CacheSettings {
                directory: default_cache_directory(),
                memo_capacity: DEFAULT_MEMO_CAPACITY,
                memo_ttl_secs: DEFAULT_MEMO_TTL_SECS,
                column_capacity: DEFAULT_COLUMN_CAPACITY,
                column_ttl_secs: DEFAULT_COLUMN_TTL_SECS,
            },
            remote: RemoteSettings {
                index_url: None,
                user_agent: DEFAULT_USER_AGENT.to_string(),
                timeout_secs: DEFAULT_TIMEOUT_SECS,
            },
            pool: PoolSettings {
                cpu_threads: default_worker_count(),
            },
            logging: LoggingSettings {
                file: default_log_file(),
            },
        }
    }
}
