//! Coordinate type definitions

use std::fmt;

/// Width and depth of one chunk column in blocks.
pub const COLUMN_SIZE: usize = 16;

/// Absolute tolerance used when comparing transformed coordinates.
pub const EPSILON: f64 = 1e-9;

/// Affine mapping between a native grid and the shared block grid.
///
/// A native coordinate `n` maps into block space as `(n + offset) * scale`
/// and back as `block / scale - offset`. Every data source carries one of
/// these so samples can be located in the world regardless of resolution
/// or origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateReference {
    scale_x: f64,
    scale_z: f64,
    offset_x: f64,
    offset_z: f64,
}

impl CoordinateReference {
    /// The block grid itself.
    pub const fn identity() -> Self {
        Self {
            scale_x: 1.0,
            scale_z: 1.0,
            offset_x: 0.0,
            offset_z: 0.0,
        }
    }

    /// A pure scale with no origin offset.
    pub fn scale(scale_x: f64, scale_z: f64) -> Self {
        Self::scale_and_offset(scale_x, scale_z, 0.0, 0.0)
    }

    /// A scale applied after shifting the native origin by `offset`.
    ///
    /// # Panics
    ///
    /// Panics if either scale is zero or any component is not finite. Use
    /// [`CoordinateReference::try_scale_and_offset`] for untrusted input.
    pub fn scale_and_offset(scale_x: f64, scale_z: f64, offset_x: f64, offset_z: f64) -> Self {
        match Self::try_scale_and_offset(scale_x, scale_z, offset_x, offset_z) {
            Ok(crs) => crs,
            Err(e) => panic!("{}", e),
        }
    }

    /// Fallible form of [`CoordinateReference::scale_and_offset`].
    pub fn try_scale_and_offset(
        scale_x: f64,
        scale_z: f64,
        offset_x: f64,
        offset_z: f64,
    ) -> Result<Self, CoordError> {
        for scale in [scale_x, scale_z] {
            if !scale.is_finite() || scale == 0.0 {
                return Err(CoordError::InvalidScale(scale));
            }
        }
        for offset in [offset_x, offset_z] {
            if !offset.is_finite() {
                return Err(CoordError::InvalidOffset(offset));
            }
        }
        Ok(Self {
            scale_x,
            scale_z,
            offset_x,
            offset_z,
        })
    }

    #[inline]
    pub fn scale_x(&self) -> f64 {
        self.scale_x
    }

    #[inline]
    pub fn scale_z(&self) -> f64 {
        self.scale_z
    }

    #[inline]
    pub fn offset_x(&self) -> f64 {
        self.offset_x
    }

    #[inline]
    pub fn offset_z(&self) -> f64 {
        self.offset_z
    }

    /// Converts a native x coordinate into block space.
    #[inline]
    pub fn block_x(&self, x: f64) -> f64 {
        (x + self.offset_x) * self.scale_x
    }

    /// Converts a native z coordinate into block space.
    #[inline]
    pub fn block_z(&self, z: f64) -> f64 {
        (z + self.offset_z) * self.scale_z
    }

    /// Converts a block x coordinate into this native grid.
    #[inline]
    pub fn native_x(&self, block_x: f64) -> f64 {
        block_x / self.scale_x - self.offset_x
    }

    /// Converts a block z coordinate into this native grid.
    #[inline]
    pub fn native_z(&self, block_z: f64) -> f64 {
        block_z / self.scale_z - self.offset_z
    }

    /// The mapping that undoes this one: block space becomes "native" and
    /// this grid becomes the output.
    pub fn inverse(&self) -> Self {
        Self {
            scale_x: 1.0 / self.scale_x,
            scale_z: 1.0 / self.scale_z,
            offset_x: -self.offset_x * self.scale_x,
            offset_z: -self.offset_z * self.scale_z,
        }
    }

    /// Applies `self` and then `next`, treating the output of `self` as the
    /// native input of `next`.
    pub fn compose(&self, next: &CoordinateReference) -> Self {
        Self {
            scale_x: self.scale_x * next.scale_x,
            scale_z: self.scale_z * next.scale_z,
            offset_x: self.offset_x + next.offset_x / self.scale_x,
            offset_z: self.offset_z + next.offset_z / self.scale_z,
        }
    }

    /// Direct mapping from this grid into `target`'s native grid.
    pub fn relative_to(&self, target: &CoordinateReference) -> Self {
        self.compose(&target.inverse())
    }

    /// Component-wise comparison within `epsilon`.
    pub fn approx_eq(&self, other: &CoordinateReference, epsilon: f64) -> bool {
        (self.scale_x - other.scale_x).abs() <= epsilon
            && (self.scale_z - other.scale_z).abs() <= epsilon
            && (self.offset_x - other.offset_x).abs() <= epsilon
            && (self.offset_z - other.offset_z).abs() <= epsilon
    }
}

impl Default for CoordinateReference {
    fn default() -> Self {
        Self::identity()
    }
}

/// A point expressed in a specific coordinate reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    crs: CoordinateReference,
    x: f64,
    z: f64,
}

impl Coordinate {
    pub fn new(crs: CoordinateReference, x: f64, z: f64) -> Self {
        Self { crs, x, z }
    }

    /// A coordinate on the block grid.
    pub fn block(x: f64, z: f64) -> Self {
        Self::new(CoordinateReference::identity(), x, z)
    }

    #[inline]
    pub fn x(&self) -> f64 {
        self.x
    }

    #[inline]
    pub fn z(&self) -> f64 {
        self.z
    }

    #[inline]
    pub fn crs(&self) -> &CoordinateReference {
        &self.crs
    }

    /// Block-space x of this coordinate.
    pub fn block_x(&self) -> f64 {
        self.crs.block_x(self.x)
    }

    /// Block-space z of this coordinate.
    pub fn block_z(&self) -> f64 {
        self.crs.block_z(self.z)
    }

    /// Re-expresses this coordinate in `target`.
    pub fn to(&self, target: &CoordinateReference) -> Coordinate {
        let relative = self.crs.relative_to(target);
        Coordinate {
            crs: *target,
            x: relative.block_x(self.x),
            z: relative.block_z(self.z),
        }
    }

    /// Component-wise minimum, expressed in `self`'s reference.
    pub fn min(&self, other: &Coordinate) -> Coordinate {
        let other = other.to(&self.crs);
        Coordinate::new(self.crs, self.x.min(other.x), self.z.min(other.z))
    }

    /// Component-wise maximum, expressed in `self`'s reference.
    pub fn max(&self, other: &Coordinate) -> Coordinate {
        let other = other.to(&self.crs);
        Coordinate::new(self.crs, self.x.max(other.x), self.z.max(other.z))
    }

    /// Compares two coordinates in block space.
    pub fn approx_eq(&self, other: &Coordinate, epsilon: f64) -> bool {
        (self.block_x() - other.block_x()).abs() <= epsilon
            && (self.block_z() - other.block_z()).abs() <= epsilon
    }
}

/// Axis-aligned integer rectangle describing a requested region.
///
/// Views are the memoization key of the data-op graph, so equality and
/// hashing are by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataView {
    x: i32,
    y: i32,
    width: usize,
    height: usize,
}

impl DataView {
    pub const fn rect(x: i32, y: i32, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub const fn square(x: i32, y: i32, size: usize) -> Self {
        Self::rect(x, y, size, size)
    }

    /// The 16×16 block view of a chunk column.
    pub fn of_column(pos: ColumnPos) -> Self {
        let (x, z) = pos.block_origin();
        Self::square(x, z, COLUMN_SIZE)
    }

    #[inline]
    pub fn x(&self) -> i32 {
        self.x
    }

    #[inline]
    pub fn y(&self) -> i32 {
        self.y
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Exclusive right edge.
    #[inline]
    pub fn max_x(&self) -> i32 {
        self.x + self.width as i32
    }

    /// Exclusive bottom edge.
    #[inline]
    pub fn max_y(&self) -> i32 {
        self.y + self.height as i32
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn area(&self) -> usize {
        self.width * self.height
    }

    /// Expands the view by the given margins. Negative margins shrink it,
    /// never below zero size.
    pub fn grow(&self, left: i32, top: i32, right: i32, bottom: i32) -> Self {
        let width = (self.width as i64 + left as i64 + right as i64).max(0) as usize;
        let height = (self.height as i64 + top as i64 + bottom as i64).max(0) as usize;
        Self::rect(self.x - left, self.y - top, width, height)
    }

    /// Overlap of two views, or `None` if they do not intersect.
    pub fn intersect(&self, other: &DataView) -> Option<DataView> {
        let min_x = self.x.max(other.x);
        let min_y = self.y.max(other.y);
        let max_x = self.max_x().min(other.max_x());
        let max_y = self.max_y().min(other.max_y());
        if max_x <= min_x || max_y <= min_y {
            return None;
        }
        Some(Self::rect(
            min_x,
            min_y,
            (max_x - min_x) as usize,
            (max_y - min_y) as usize,
        ))
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && y >= self.y && x < self.max_x() && y < self.max_y()
    }

    /// Top-left corner as a block coordinate.
    pub fn min_coordinate(&self) -> Coordinate {
        Coordinate::block(self.x as f64, self.y as f64)
    }

    /// Bottom-right (exclusive) corner as a block coordinate.
    pub fn max_coordinate(&self) -> Coordinate {
        Coordinate::block(self.max_x() as f64, self.max_y() as f64)
    }
}

impl fmt::Display for DataView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}; {}x{}]",
            self.x, self.y, self.width, self.height
        )
    }
}

/// Address of a tile in a tiled source's tile grid.
///
/// Distinct from [`DataView`]: one unit here is a whole tile, not a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DataTilePos {
    pub tile_x: i32,
    pub tile_z: i32,
}

impl DataTilePos {
    pub const fn new(tile_x: i32, tile_z: i32) -> Self {
        Self { tile_x, tile_z }
    }

    /// Per-axis minimum of two tile addresses.
    pub fn component_min(&self, other: &DataTilePos) -> DataTilePos {
        DataTilePos::new(self.tile_x.min(other.tile_x), self.tile_z.min(other.tile_z))
    }

    /// Per-axis maximum of two tile addresses.
    pub fn component_max(&self, other: &DataTilePos) -> DataTilePos {
        DataTilePos::new(self.tile_x.max(other.tile_x), self.tile_z.max(other.tile_z))
    }
}

impl fmt::Display for DataTilePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.tile_x, self.tile_z)
    }
}

/// Address of a chunk column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnPos {
    pub x: i32,
    pub z: i32,
}

impl ColumnPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Block coordinates of the column's north-west corner.
    #[inline]
    pub fn block_origin(&self) -> (i32, i32) {
        (self.x * COLUMN_SIZE as i32, self.z * COLUMN_SIZE as i32)
    }

    /// The column containing the given block.
    pub fn containing_block(block_x: i32, block_z: i32) -> Self {
        Self::new(
            block_x.div_euclid(COLUMN_SIZE as i32),
            block_z.div_euclid(COLUMN_SIZE as i32),
        )
    }
}

impl fmt::Display for ColumnPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "column({}, {})", self.x, self.z)
    }
}

/// Errors that can occur when building coordinate references.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordError {
    /// Scale is zero, infinite or NaN
    InvalidScale(f64),
    /// Offset is infinite or NaN
    InvalidOffset(f64),
}

impl fmt::Display for CoordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordError::InvalidScale(scale) => {
                write!(f, "Invalid scale: {} (must be finite and non-zero)", scale)
            }
            CoordError::InvalidOffset(offset) => {
                write!(f, "Invalid offset: {} (must be finite)", offset)
            }
        }
    }
}

impl std::error::Error for CoordError {}
