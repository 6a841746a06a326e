//! Elevation tiles, signed metres above sea level.

use std::sync::Arc;

use super::cache::TileCache;
use super::codec::decode_i16_tile;
use super::http::TileClient;
use super::index::RemoteIndex;
use super::tiled::{fetch_decoded, TiledDataSource};
use crate::coord::{CoordinateReference, DataTilePos};
use crate::dataop::WorkerPool;
use crate::error::DataResult;
use crate::raster::ShortRaster;
use crate::world::WorldScale;

pub const DATASET: &str = "elevation";
pub const TILE_SIZE: usize = 1200;
pub const GLOBAL_WIDTH: usize = 432_000;
pub const GLOBAL_HEIGHT: usize = 216_000;

/// Global elevation model. Ocean tiles are simply missing from the remote.
pub struct ElevationSource<C> {
    crs: CoordinateReference,
    cache: TileCache<C>,
    index: Option<Arc<RemoteIndex>>,
    pool: WorkerPool,
    tile_size: usize,
}

impl<C: TileClient> ElevationSource<C> {
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

impl<C: TileClient> TiledDataSource for ElevationSource<C> {
    type Tile = ShortRaster;

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

    async fn load(&self, pos: DataTilePos) -> DataResult<ShortRaster> {
        let size = self.tile_size;
        fetch_decoded(
            &self.cache,
            self.index.as_deref(),
            DATASET,
            pos,
            &self.pool,
            move |payload| decode_i16_tile(payload, size, size),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::Raster;
    use crate::source::codec::encode_i16_tile;
    use crate::source::http::mock::MockClient;
    use bytes::Bytes;
    use tempfile::TempDir;

    fn index() -> Arc<RemoteIndex> {
        let json = br#"{ "datasets": { "elevation": { "url": "mock://el/{x}/{z}" } } }"#;
        Arc::new(RemoteIndex::parse(json).unwrap())
    }

    #[tokio::test]
    async fn test_load_decodes_tile() {
        let temp = TempDir::new().unwrap();
        let client = MockClient::new();
        let tile = Raster::filled(4, 4, 321i16);
        client.respond(
            "mock://el/2/3",
            Ok(Some(Bytes::from(encode_i16_tile(&tile).unwrap()))),
        );

        let source = ElevationSource::new(
            &WorldScale::default(),
            TileCache::new(temp.path(), Arc::new(client)),
            Some(index()),
            WorkerPool::new(1, "test"),
        )
        .with_tile_size(4);

        let loaded = source.load(DataTilePos::new(2, 3)).await.unwrap();
        assert_eq!(loaded, Some(tile));
    }

    #[tokio::test]
    async fn test_no_index_is_absent() {
        let temp = TempDir::new().unwrap();
        let client = MockClient::new();
        let source = ElevationSource::new(
            &WorldScale::default(),
            TileCache::new(temp.path(), Arc::new(client.clone())),
            None,
            WorkerPool::new(1, "test"),
        );

        assert_eq!(source.load(DataTilePos::new(0, 0)).await, Ok(None));
        assert_eq!(client.total_requests(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_tile_is_decode_error() {
        let temp = TempDir::new().unwrap();
        let client = MockClient::new();
        client.respond("mock://el/0/0", Ok(Some(Bytes::from_static(b"junk"))));

        let source = ElevationSource::new(
            &WorldScale::default(),
            TileCache::new(temp.path(), Arc::new(client)),
            Some(index()),
            WorkerPool::new(1, "test"),
        );

        let result = source.load(DataTilePos::new(0, 0)).await;
        assert!(matches!(result, Err(crate::error::DataError::Decode(_))));
    }
}
