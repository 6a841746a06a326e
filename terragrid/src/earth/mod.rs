//! Earth datasets wired into column data.
//!
//! [`EarthContext`] holds the per-session reference data (remote index,
//! climate raster, tile cache, worker pool). [`EarthOps`] builds the data
//! op graph from it, and [`earth_generator`] registers that graph as a
//! [`ColumnDataGenerator`](crate::column::ColumnDataGenerator).

mod context;
mod cover;
mod graph;
mod landform;

pub use context::EarthContext;
pub use cover::Cover;
pub use graph::{earth_generator, landform_op, water_op, EarthOps};
pub use landform::{classify_raster, Landform};
