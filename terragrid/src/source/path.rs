//! Tile cache path construction.

use std::path::{Path, PathBuf};

use crate::coord::DataTilePos;

/// File extension of cached tile payloads.
pub const TILE_EXTENSION: &str = "gz";

/// Construct the full path for a cached tile.
///
/// Creates a hierarchical path structure:
/// ```text
/// <cache_dir>/<dataset>/<tile_x>/<tile_z>.gz
/// ```
///
/// # Example
///
/// ```
/// use std::path::PathBuf;
/// use terragrid::coord::DataTilePos;
/// use terragrid::source::tile_path;
///
/// let path = tile_path(&PathBuf::from("/cache"), "landcover", &DataTilePos::new(36, -4));
/// assert_eq!(path, PathBuf::from("/cache/landcover/36/-4.gz"));
/// ```
pub fn tile_path(cache_dir: &Path, dataset: &str, pos: &DataTilePos) -> PathBuf {
    column_directory(cache_dir, dataset, pos).join(format!("{}.{}", pos.tile_z, TILE_EXTENSION))
}

/// Directory holding every cached tile of one tile column.
pub fn column_directory(cache_dir: &Path, dataset: &str, pos: &DataTilePos) -> PathBuf {
    dataset_directory(cache_dir, dataset).join(pos.tile_x.to_string())
}

/// Directory holding every cached tile of a dataset.
pub fn dataset_directory(cache_dir: &Path, dataset: &str) -> PathBuf {
    cache_dir.join(dataset)
}

/// Temporary sibling used while a tile is being written.
pub fn partial_path(final_path: &Path) -> PathBuf {
    let mut name = final_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".partial");
    final_path.with_file_name(name)
}
