//! Remote tiled datasets.
//!
//! Every global dataset lives remotely as fixed-size tiles on its own native
//! grid. Loading a tile goes through a shared disk [`TileCache`]:
//!
//! ```text
//! TiledDataSource::load(pos)
//!     → RemoteIndex URL lookup (absent if unknown)
//!     → TileCache: absent set → RequestCoalescer → disk → TileClient
//!     → codec decode on the WorkerPool
//! ```
//!
//! # Key Components
//!
//! - [`TiledDataSource`] - tile position to tile, with a coordinate reference
//! - [`TileCache`] - disk persistence, request coalescing, session absent set
//! - [`TileClient`] / [`ReqwestClient`] - HTTP GET abstraction
//! - [`RemoteIndex`] - where each dataset's tiles live
//! - [`WorldClimateRaster`] - the single global climate raster

pub mod cache;
pub mod climate;
pub mod codec;
mod coalesce;
pub mod elevation;
pub mod http;
pub mod index;
pub mod landcover;
pub mod osm;
mod path;
pub mod tiled;

pub use cache::{TileCache, TileCacheStats, TileKey};
pub use climate::{Temperature, WorldClimateRaster};
pub use coalesce::{CoalesceResult, CoalescerStats, RequestCoalescer};
pub use elevation::ElevationSource;
pub use http::{ReqwestClient, TileClient, DEFAULT_USER_AGENT};
pub use index::{IndexError, RemoteIndex};
pub use landcover::LandCoverSource;
pub use osm::{sample_tiles, Area, AreaKind, OsmSource, OsmTile};
pub use path::{dataset_directory, tile_path};
pub use tiled::{sample_raster, TiledDataSource};
