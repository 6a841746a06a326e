//! INI serialization: `ConfigFile` → commented config.ini text.

use std::path::Path;

use super::settings::ConfigFile;

/// Renders `config` as a commented INI document.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let index_url = config.remote.index_url.as_deref().unwrap_or("");

    format!(
        r#"[world]
; Real-world metres covered by one block (default: 30)
meters_per_block = {}

[cache]
; Root directory of the disk tile cache
; Tiles are stored as <directory>/<dataset>/<x>/<z>.gz
directory = {}
; Views remembered per memoized data op (default: 4)
memo_capacity = {}
; Seconds a memoized view survives without being read (default: 5)
memo_ttl_secs = {}
; Released columns kept in memory before the oldest are evicted (default: 256)
column_capacity = {}
; Seconds a released column stays cached (default: 30)
column_ttl_secs = {}

[remote]
; URL of the remote dataset index (JSON). Leave empty to run without tiled data
index_url = {}
; User-Agent header sent with every request
user_agent = {}
; HTTP request timeout in seconds (default: 30)
timeout_secs = {}

[pool]
; Concurrent decode/rasterize jobs (default: number of CPU cores)
cpu_threads = {}

[logging]
; Log file, cleared at the start of each session
file = {}
"#,
        config.world.meters_per_block,
        path_to_string(&config.cache.directory),
        config.cache.memo_capacity,
        config.cache.memo_ttl_secs,
        config.cache.column_capacity,
        config.cache.column_ttl_secs,
        index_url,
        config.remote.user_agent,
        config.remote.timeout_secs,
        config.pool.cpu_threads,
        path_to_string(&config.logging.file),
    )
}

/// Collapses the home directory back to `~`.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}
