//! Land cover classification tiles.

use std::sync::Arc;

use super::cache::TileCache;
use super::codec::decode_u8_tile;
use super::http::TileClient;
use super::index::RemoteIndex;
use super::tiled::{fetch_decoded, TiledDataSource};
use crate::coord::{CoordinateReference, DataTilePos};
use crate::dataop::WorkerPool;
use crate::error::DataResult;
use crate::raster::UByteRaster;
use crate::world::WorldScale;

pub const DATASET: &str = "landcover";
pub const TILE_SIZE: usize = 1800;
pub const GLOBAL_WIDTH: usize = 129_600;
pub const GLOBAL_HEIGHT: usize = 64_800;

/// Global land cover classes, one byte per cell.
pub struct LandCoverSource<C> {
    crs: CoordinateReference,
    cache: TileCache<C>,
    index: Option<Arc<RemoteIndex>>,
    pool: WorkerPool,
    tile_size: usize,
}

impl<C: TileClient> LandCoverSource<C> {
    pub fn new(
        world: &WorldScale,
        cache: TileCache<C>,
        index: Option<Arc<RemoteIndex>>,
        pool: WorkerPool,
    ) -> Self {
        Self {
            crs: world.crs_for(GLOBAL_WIDTH as f64, GLOBAL_HEIGHT as f64),
            cache,
            index,
            pool,
            tile_size: TILE_SIZE,
        }
    }

    /// Overrides the tile size; for small synthetic datasets.
    pub fn with_tile_size(mut self, tile_size: usize) -> Self {
        self.tile_size = tile_size;
        self
    }
}

impl<C: TileClient> TiledDataSource for LandCoverSource<C> {
    type Tile = UByteRaster;

    fn name(&self) -> &str {
        DATASET
    }

    fn crs(&self) -> CoordinateReference {
        self.crs
    }

    fn tile_width(&self) -> usize {
        self.tile_size
    }

    fn tile_height(&self) -> usize {
        self.tile_size
    }

    async fn load(&self, pos: DataTilePos) -> DataResult<UByteRaster> {
        let size = self.tile_size;
        fetch_decoded(
            &self.cache,
            self.index.as_deref(),
            DATASET,
            pos,
            &self.pool,
            move |payload| decode_u8_tile(payload, size, size),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::http::mock::MockClient;
    use tempfile::TempDir;

    #[test]
    fn test_crs_maps_grid_centre_to_origin() {
        let temp = TempDir::new().unwrap();
        let source = LandCoverSource::new(
            &WorldScale::default(),
            TileCache::new(temp.path(), Arc::new(MockClient::new())),
            None,
            WorkerPool::new(1, "test"),
        );

        let crs = source.crs();
        assert!(crs.block_x(GLOBAL_WIDTH as f64 / 2.0).abs() < 1e-6);
        assert!(crs.block_z(GLOBAL_HEIGHT as f64 / 2.0).abs() < 1e-6);
        assert_eq!(source.tile_width(), TILE_SIZE);
    }

    #[tokio::test]
    async fn test_tile_outside_coverage_is_absent() {
        let temp = TempDir::new().unwrap();
        let client = MockClient::new();
        let json = br#"{ "datasets": { "landcover": { "url": "mock://lc/{x}/{z}", "tiles": [[0, 0]] } } }"#;
        let index = Arc::new(RemoteIndex::parse(json).unwrap());

        let source = LandCoverSource::new(
            &WorldScale::default(),
            TileCache::new(temp.path(), Arc::new(client.clone())),
            Some(index),
            WorkerPool::new(1, "test"),
        );

        assert_eq!(source.load(DataTilePos::new(5, 5)).await, Ok(None));
        assert_eq!(client.total_requests(), 0);
    }
}
