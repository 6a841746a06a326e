//! Resampling of native-grid rasters onto the block grid.
//!
//! [`VoronoiScaleOp`] wraps a raster op expressed in a source's native grid
//! and produces an op over block-space views, using [`Voronoi`] to pick a
//! source value for every destination cell.

mod voronoi;

pub use voronoi::{Voronoi, DEFAULT_EXPONENT, DEFAULT_MAGNITUDE};

use tracing::trace;

use crate::coord::{CoordinateReference, DataView};
use crate::dataop::DataOp;
use crate::raster::Raster;

/// Builds block-space resampling ops over native-grid sources.
pub struct VoronoiScaleOp;

impl VoronoiScaleOp {
    /// Resamples `data` (keyed by native views in `src`) onto the block grid
    /// with the default Voronoi parameters.
    pub fn scale_from<T>(data: DataOp<Raster<T>>, src: CoordinateReference) -> DataOp<Raster<T>>
    where
        T: Copy + Default + Send + Sync + 'static,
    {
        Self::scale_with(data, src, Voronoi::default())
    }

    /// Resamples with explicit Voronoi parameters.
    pub fn scale_with<T>(
        data: DataOp<Raster<T>>,
        src: CoordinateReference,
        voronoi: Voronoi,
    ) -> DataOp<Raster<T>>
    where
        T: Copy + Default + Send + Sync + 'static,
    {
        DataOp::of(move |view: DataView| {
            let src_view = source_view(&view, &src);
            trace!(view = %view, src_view = %src_view, "Voronoi resample");

            let data = data.clone();
            async move {
                let Some(source) = data.apply(src_view).await? else {
                    return Ok(None);
                };

                let mut result = Raster::for_view(&view);
                voronoi.scale(&source, &src_view, &mut result, &view, &src);
                Ok(Some(result))
            }
        })
    }
}

/// The native-grid view needed to resample `view`.
///
/// The projected bounding box is padded to `floor(min) - 1 .. floor(max) + 2`
/// so every destination cell has its full 3×3 neighbourhood available.
pub fn source_view(view: &DataView, src: &CoordinateReference) -> DataView {
    let a = view.min_coordinate().to(src);
    let b = view.max_coordinate().to(src);
    let min = a.min(&b);
    let max = a.max(&b);

    let min_x = min.x().floor() as i32 - 1;
    let min_y = min.z().floor() as i32 - 1;
    let max_x = max.x().floor() as i32 + 2;
    let max_y = max.z().floor() as i32 + 2;

    DataView::rect(
        min_x,
        min_y,
        (max_x - min_x) as usize,
        (max_y - min_y) as usize,
    )
}
