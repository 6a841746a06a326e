//! INI parsing: `Ini` → `ConfigFile`.
//!
//! The single place where INI key names map to struct fields.

use std::path::PathBuf;
use std::str::FromStr;

use ini::{Ini, Properties};

use super::file::ConfigFileError;
use super::settings::ConfigFile;
use crate::world::WorldScale;

/// Parses an `Ini` into a `ConfigFile`, overlaying defaults.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [world]
    if let Some(section) = ini.section(Some("world")) {
        if let Some(v) = section.get("meters_per_block") {
            let meters: f64 = parse_value("world", "meters_per_block", v, "must be a number")?;
            WorldScale::new(meters).map_err(|e| invalid("world", "meters_per_block", v, &e.to_string()))?;
            config.world.meters_per_block = meters;
        }
    }

    // [cache]
    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = non_empty(section, "directory") {
            config.cache.directory = expand_tilde(v);
        }
        if let Some(v) = section.get("memo_capacity") {
            config.cache.memo_capacity = parse_positive("cache", "memo_capacity", v)?;
        }
        if let Some(v) = section.get("memo_ttl_secs") {
            config.cache.memo_ttl_secs =
                parse_value("cache", "memo_ttl_secs", v, "must be a whole number of seconds")?;
        }
        if let Some(v) = section.get("column_capacity") {
            config.cache.column_capacity = parse_value(
                "cache",
                "column_capacity",
                v,
                "must be a non-negative integer",
            )?;
        }
        if let Some(v) = section.get("column_ttl_secs") {
            config.cache.column_ttl_secs =
                parse_value("cache", "column_ttl_secs", v, "must be a whole number of seconds")?;
        }
    }

    // [remote]
    if let Some(section) = ini.section(Some("remote")) {
        if let Some(v) = non_empty(section, "index_url") {
            if !(v.starts_with("http://") || v.starts_with("https://")) {
                return Err(invalid("remote", "index_url", v, "must be an http(s) URL"));
            }
            config.remote.index_url = Some(v.to_string());
        }
        if let Some(v) = non_empty(section, "user_agent") {
            config.remote.user_agent = v.to_string();
        }
        if let Some(v) = section.get("timeout_secs") {
            config.remote.timeout_secs = parse_positive("remote", "timeout_secs", v)?;
        }
    }

    // [pool]
    if let Some(section) = ini.section(Some("pool")) {
        if let Some(v) = section.get("cpu_threads") {
            config.pool.cpu_threads = parse_positive("pool", "cpu_threads", v)?;
        }
    }

    // [logging]
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = non_empty(section, "file") {
            config.logging.file = expand_tilde(v);
        }
    }

    Ok(config)
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn non_empty<'a>(section: &'a Properties, key: &str) -> Option<&'a str> {
    section.get(key).map(str::trim).filter(|v| !v.is_empty())
}

fn parse_value<T: FromStr>(
    section: &str,
    key: &str,
    value: &str,
    reason: &str,
) -> Result<T, ConfigFileError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, reason))
}

fn parse_positive<T>(section: &str, key: &str, value: &str) -> Result<T, ConfigFileError>
where
    T: FromStr + PartialOrd + Default,
{
    let parsed: T = parse_value(section, key, value, "must be a positive integer")?;
    if parsed <= T::default() {
        return Err(invalid(section, key, value, "must be a positive integer"));
    }
    Ok(parsed)
}

/// Expands a leading `~/` to the home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
