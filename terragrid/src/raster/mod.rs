//! Fixed-size typed sample grids.
//!
//! A [`Raster`] is mutable while a data op populates it and is published
//! behind an `Arc` once it lands in a column bundle, after which it is only
//! read.

pub mod rasterize;
mod sampler;

pub use sampler::Sampler;

use crate::coord::DataView;

/// One byte per cell (classification ids, packed climate values).
pub type UByteRaster = Raster<u8>;
/// Signed 16-bit samples (elevation in metres, rainfall in millimetres).
pub type ShortRaster = Raster<i16>;
/// Floating point samples (temperatures).
pub type FloatRaster = Raster<f32>;
/// Per-cell enum values.
pub type EnumRaster<E> = Raster<E>;
/// Per-cell flags (rasterized areas).
pub type BitRaster = Raster<bool>;

/// Row-major 2D grid of `width * height` samples.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster<T> {
    width: usize,
    height: usize,
    data: Vec<T>,
}

impl<T: Copy + Default> Raster<T> {
    /// Creates a raster filled with `T::default()`.
    pub fn new(width: usize, height: usize) -> Self {
        Self::filled(width, height, T::default())
    }

    /// Creates a raster sized to `view`.
    pub fn for_view(view: &DataView) -> Self {
        Self::new(view.width(), view.height())
    }
}

impl<T: Copy> Raster<T> {
    pub fn filled(width: usize, height: usize, value: T) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    /// Wraps existing row-major data.
    ///
    /// Returns `None` if `data.len()` does not equal `width * height`.
    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> Option<Self> {
        if data.len() != width * height {
            return None;
        }
        Some(Self {
            width,
            height,
            data,
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn index(&self, x: usize, y: usize) -> usize {
        assert!(
            x < self.width && y < self.height,
            "raster access ({}, {}) out of bounds for {}x{}",
            x,
            y,
            self.width,
            self.height
        );
        x + y * self.width
    }

    /// Reads a cell.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` lies outside the raster.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> T {
        self.data[self.index(x, y)]
    }

    /// Reads a cell, returning `None` outside the raster. Accepts signed
    /// coordinates so callers can probe neighbours without casting.
    #[inline]
    pub fn try_get(&self, x: i64, y: i64) -> Option<T> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        Some(self.data[x as usize + y as usize * self.width])
    }

    /// Writes a cell.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` lies outside the raster.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: T) {
        let index = self.index(x, y);
        self.data[index] = value;
    }

    pub fn fill(&mut self, value: T) {
        self.data.iter_mut().for_each(|cell| *cell = value);
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    /// Iterates `(x, y, value)` in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, T)> + '_ {
        let width = self.width;
        self.data
            .iter()
            .enumerate()
            .map(move |(i, v)| (i % width, i / width, *v))
    }

    /// Applies `f` to every cell, producing a raster of the same size.
    pub fn map<U: Copy>(&self, f: impl Fn(T) -> U) -> Raster<U> {
        Raster {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(|v| f(*v)).collect(),
        }
    }

    /// Copies the overlap of `src` (located at `src_view`) into `self`
    /// (located at `dest_view`). Both views must be in the same grid.
    ///
    /// Returns the number of cells copied.
    pub fn copy_from(&mut self, dest_view: &DataView, src: &Raster<T>, src_view: &DataView) -> usize {
        debug_assert_eq!(dest_view.width(), self.width);
        debug_assert_eq!(src_view.width(), src.width);

        let Some(overlap) = dest_view.intersect(src_view) else {
            return 0;
        };

        for y in overlap.y()..overlap.max_y() {
            let src_row = (y - src_view.y()) as usize;
            let dest_row = (y - dest_view.y()) as usize;
            let src_start = (overlap.x() - src_view.x()) as usize + src_row * src.width;
            let dest_start = (overlap.x() - dest_view.x()) as usize + dest_row * self.width;
            self.data[dest_start..dest_start + overlap.width()]
                .copy_from_slice(&src.data[src_start..src_start + overlap.width()]);
        }

        overlap.area()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_raster_is_default_filled() {
        let raster: ShortRaster = Raster::new(3, 2);
        assert_eq!(raster.width(), 3);
        assert_eq!(raster.height(), 2);
        assert!(raster.data().iter().all(|v| *v == 0));
    }

    #[test]
    fn test_get_set_row_major() {
        let mut raster: UByteRaster = Raster::new(4, 4);
        raster.set(1, 2, 7);
        assert_eq!(raster.get(1, 2), 7);
        assert_eq!(raster.data()[1 + 2 * 4], 7);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_get_out_of_bounds_panics() {
        let raster: UByteRaster = Raster::new(2, 2);
        raster.get(2, 0);
    }

    #[test]
    fn test_try_get_outside_is_none() {
        let raster = Raster::filled(2, 2, 1.5f32);
        assert_eq!(raster.try_get(-1, 0), None);
        assert_eq!(raster.try_get(1, 1), Some(1.5));
        assert_eq!(raster.try_get(2, 1), None);
    }

    #[test]
    fn test_from_vec_checks_length() {
        assert!(Raster::from_vec(2, 2, vec![1u8, 2, 3]).is_none());
        let raster = Raster::from_vec(2, 2, vec![1u8, 2, 3, 4]).unwrap();
        assert_eq!(raster.get(1, 1), 4);
    }

    #[test]
    fn test_copy_from_overlap() {
        let mut dest: UByteRaster = Raster::new(4, 4);
        let dest_view = DataView::square(0, 0, 4);

        let src = Raster::filled(4, 4, 9u8);
        let src_view = DataView::square(2, 2, 4);

        let copied = dest.copy_from(&dest_view, &src, &src_view);
        assert_eq!(copied, 4);
        assert_eq!(dest.get(1, 1), 0);
        assert_eq!(dest.get(2, 2), 9);
        assert_eq!(dest.get(3, 3), 9);
        assert_eq!(dest.get(3, 1), 0);
    }

    #[test]
    fn test_copy_from_disjoint_is_noop() {
        let mut dest: UByteRaster = Raster::new(2, 2);
        let src = Raster::filled(2, 2, 1u8);
        let copied = dest.copy_from(
            &DataView::square(0, 0, 2),
            &src,
            &DataView::square(5, 5, 2),
        );
        assert_eq!(copied, 0);
        assert!(dest.data().iter().all(|v| *v == 0));
    }

    #[test]
    fn test_map_and_iter() {
        let raster = Raster::from_vec(2, 1, vec![1i16, 2]).unwrap();
        let doubled = raster.map(|v| v as f32 * 2.0);
        let cells: Vec<_> = doubled.iter().collect();
        assert_eq!(cells, vec![(0, 0, 2.0), (1, 0, 4.0)]);
    }
}
