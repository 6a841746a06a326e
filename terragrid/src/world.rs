//! World scale configuration.
//!
//! Every dataset covers the whole globe on its own equirectangular grid.
//! [`WorldScale`] turns a dataset's global grid size into the
//! [`CoordinateReference`] mapping that grid onto the block grid, with the
//! prime meridian and equator at block `(0, 0)`.

use std::fmt;

use crate::coord::{CoordError, CoordinateReference};

/// Equatorial circumference of the Earth in metres.
pub const EARTH_CIRCUMFERENCE: f64 = 40_075_017.0;

/// Metres covered by one block when nothing else is configured.
pub const DEFAULT_METERS_PER_BLOCK: f64 = 30.0;

/// How many real-world metres one block represents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldScale {
    meters_per_block: f64,
}

impl WorldScale {
    /// Creates a world scale.
    ///
    /// Fails if `meters_per_block` is not a finite, positive number.
    pub fn new(meters_per_block: f64) -> Result<Self, CoordError> {
        if !meters_per_block.is_finite() || meters_per_block <= 0.0 {
            return Err(CoordError::InvalidScale(meters_per_block));
        }
        Ok(Self { meters_per_block })
    }

    pub fn meters_per_block(&self) -> f64 {
        self.meters_per_block
    }

    /// Blocks covered by one cell of a grid `global_width` cells wide.
    pub fn blocks_per_cell(&self, global_width: f64) -> f64 {
        (EARTH_CIRCUMFERENCE / global_width) / self.meters_per_block
    }

    /// Coordinate reference of a global grid of `global_width`×`global_height`
    /// cells, centred on block `(0, 0)`.
    pub fn crs_for(&self, global_width: f64, global_height: f64) -> CoordinateReference {
        let scale = self.blocks_per_cell(global_width);
        CoordinateReference::scale_and_offset(
            scale,
            scale,
            -global_width / 2.0,
            -global_height / 2.0,
        )
    }

    /// Blocks from the equator to a pole.
    pub fn half_circumference_blocks(&self) -> f64 {
        EARTH_CIRCUMFERENCE / 2.0 / self.meters_per_block
    }
}

impl Default for WorldScale {
    fn default() -> Self {
        Self {
            meters_per_block: DEFAULT_METERS_PER_BLOCK,
        }
    }
}

impl fmt::Display for WorldScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "1:{}", self.meters_per_block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::{Coordinate, EPSILON};

    #[test]
    fn test_rejects_non_positive_scale() {
        assert!(WorldScale::new(0.0).is_err());
        assert!(WorldScale::new(-1.0).is_err());
        assert!(WorldScale::new(f64::NAN).is_err());
        assert!(WorldScale::new(1.0).is_ok());
    }

    #[test]
    fn test_grid_centre_is_block_origin() {
        let world = WorldScale::new(10.0).unwrap();
        let crs = world.crs_for(4320.0, 2160.0);

        let centre = Coordinate::new(crs, 2160.0, 1080.0);
        assert!(centre.block_x().abs() < EPSILON);
        assert!(centre.block_z().abs() < EPSILON);
    }

    #[test]
    fn test_full_width_spans_circumference() {
        let world = WorldScale::new(100.0).unwrap();
        let crs = world.crs_for(129_600.0, 64_800.0);

        let west = Coordinate::new(crs, 0.0, 0.0).block_x();
        let east = Coordinate::new(crs, 129_600.0, 0.0).block_x();
        assert!(((east - west) - EARTH_CIRCUMFERENCE / 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_datasets_align_in_block_space() {
        let world = WorldScale::default();
        let climate = world.crs_for(4320.0, 2160.0);
        let cover = world.crs_for(129_600.0, 64_800.0);

        // One climate cell is 30 land cover cells
        let a = Coordinate::new(climate, 100.0, 50.0);
        let b = a.to(&cover);
        assert!((b.x() - 3000.0).abs() < 1e-6);
        assert!((b.z() - 1500.0).abs() < 1e-6);
    }
}
