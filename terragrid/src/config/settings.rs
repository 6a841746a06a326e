//! Settings structs, one per `[section]` of the INI config file.
//!
//! Pure data; parsing lives in [`super::parser`] and serialization in
//! [`super::writer`].

use std::path::PathBuf;

/// Complete configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub world: WorldSettings,
    pub cache: CacheSettings,
    pub remote: RemoteSettings,
    pub pool: PoolSettings,
    pub logging: LoggingSettings,
}

/// World scale.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldSettings {
    /// Real-world metres covered by one block
    pub meters_per_block: f64,
}

/// Disk and in-memory cache sizing.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    /// Root of the disk tile cache
    pub directory: PathBuf,
    /// Views kept per memoized data op
    pub memo_capacity: u64,
    /// Idle expiry of memoized views, seconds
    pub memo_ttl_secs: u64,
    /// Released columns kept before eviction
    pub column_capacity: usize,
    /// Time a released column stays cached, seconds
    pub column_ttl_secs: u64,
}

/// Remote dataset access.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteSettings {
    /// URL of the remote dataset index; no tiled data without one
    pub index_url: Option<String>,
    pub user_agent: String,
    /// HTTP request timeout, seconds
    pub timeout_secs: u64,
}

/// Worker pool sizing.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolSettings {
    /// Concurrent blocking jobs (decode, rasterize)
    pub cpu_threads: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    /// Log file path
    pub file: PathBuf,
}
