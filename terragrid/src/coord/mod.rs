//! Coordinate reference module
//!
//! Provides the affine transforms between the world's block grid and each
//! data source's native grid, together with the integer views and tile
//! addresses used to request data.

mod types;

pub use types::{
    ColumnPos, Coordinate, CoordinateReference, CoordError, DataTilePos, DataView, COLUMN_SIZE,
    EPSILON,
};

/// Returns the tile containing `coordinate` for a tiled grid expressed in
/// `crs` with tiles of `tile_width`×`tile_height` native cells.
#[inline]
pub fn tile_at(
    coordinate: &Coordinate,
    crs: &CoordinateReference,
    tile_width: f64,
    tile_height: f64,
) -> DataTilePos {
    let native = coordinate.to(crs);
    DataTilePos::new(
        (native.x() / tile_width).floor() as i32,
        (native.z() / tile_height).floor() as i32,
    )
}

/// Returns the inclusive range of tiles touched by a block-space view.
///
/// The corners are projected independently and then ordered, so negative
/// scales (flipped axes) still yield `min <= max`.
pub fn tiles_covering(
    view: &DataView,
    crs: &CoordinateReference,
    tile_width: f64,
    tile_height: f64,
) -> (DataTilePos, DataTilePos) {
    let a = tile_at(&view.min_coordinate(), crs, tile_width, tile_height);
    let b = tile_at(&view.max_coordinate(), crs, tile_width, tile_height);
    (a.component_min(&b), a.component_max(&b))
}

#[cfg(test)]
mod tests;
