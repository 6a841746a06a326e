//! terragrid - real-world geodata for block worlds
//!
//! Fetches global elevation, land cover, climate and OpenStreetMap datasets
//! tile by tile, caches them on disk, resamples them onto the block grid and
//! assembles them into one immutable bundle per 16×16 chunk column.
//!
//! # High-Level API
//!
//! ```ignore
//! use terragrid::column::{keys, ColumnDataCache};
//! use terragrid::earth::{earth_generator, EarthContext};
//!
//! let ctx = EarthContext::load(world, tile_cache, pool, Some(index_url)).await;
//! let columns = ColumnDataCache::new(
//!     earth_generator(&ctx, config.memo_config()),
//!     config.column_cache_config(),
//!     Handle::current(),
//! );
//!
//! let lease = columns.acquire(ColumnPos::new(0, 0));
//! let data = lease.future().await?;
//! let elevation = data.get::<keys::Elevation>();
//! ```
//!
//! # Layers
//!
//! - [`coord`] - coordinate references, views, tile addresses
//! - [`raster`] - typed grids, samplers, polygon fill
//! - [`dataop`] - the lazy data-op graph and its worker pool
//! - [`source`] - remote tiled datasets behind a disk cache
//! - [`resample`] - Voronoi reprojection onto the block grid
//! - [`column`] - per-column bundles and their reference-counted cache
//! - [`earth`] - the concrete earth product graph

pub mod column;
pub mod config;
pub mod coord;
pub mod dataop;
pub mod earth;
pub mod error;
pub mod logging;
pub mod raster;
pub mod resample;
pub mod source;
pub mod world;

/// Version of the library and CLI, shared across the workspace.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
