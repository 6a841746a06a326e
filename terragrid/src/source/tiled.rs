//! Tiled data sources and the ops that sample them.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use moka::future::Cache;
use tracing::{trace, warn};

use super::cache::{TileCache, TileKey};
use super::http::TileClient;
use super::index::RemoteIndex;
use crate::coord::{CoordinateReference, DataTilePos, DataView};
use crate::dataop::{DataOp, WorkerPool};
use crate::error::{DataError, DataResult};
use crate::raster::Raster;

/// Decoded tiles kept per sampling op.
const DECODED_TILE_CAPACITY: u64 = 16;
const DECODED_TILE_IDLE: Duration = Duration::from_secs(30);

/// A global dataset split into fixed-size tiles on its native grid.
///
/// Sources are stateless maps from tile position to tile: loading the same
/// position twice yields equal tiles, and a missing tile is `Ok(None)`.
pub trait TiledDataSource: Send + Sync + 'static {
    type Tile: Send + Sync + 'static;

    /// Short dataset name, used for cache paths and index lookups.
    fn name(&self) -> &str;

    /// Mapping from this source's native grid to the block grid.
    fn crs(&self) -> CoordinateReference;

    /// Tile width in native cells.
    fn tile_width(&self) -> usize;

    /// Tile height in native cells.
    fn tile_height(&self) -> usize;

    fn load(&self, pos: DataTilePos) -> impl Future<Output = DataResult<Self::Tile>> + Send;
}

/// Loads a remote tile through the cache and decodes it on `pool`.
///
/// Absent when there is no index, the index has no URL for the tile, or the
/// remote reports it missing.
pub async fn fetch_decoded<C, T, D>(
    cache: &TileCache<C>,
    index: Option<&RemoteIndex>,
    dataset: &str,
    pos: DataTilePos,
    pool: &WorkerPool,
    decode: D,
) -> DataResult<T>
where
    C: TileClient,
    T: Send + 'static,
    D: FnOnce(&[u8]) -> Result<T, DataError> + Send + 'static,
{
    let Some(index) = index else {
        return Ok(None);
    };
    let url = index.url_for(dataset, &pos);

    match cache.load(TileKey::new(dataset, pos), url).await? {
        Some(payload) => pool.run(move || decode(&payload)).await?.map(Some),
        None => Ok(None),
    }
}

/// Inclusive range of tiles overlapping a native-grid view.
pub fn tiles_in_native_view(
    view: &DataView,
    tile_width: usize,
    tile_height: usize,
) -> (DataTilePos, DataTilePos) {
    let (tw, th) = (tile_width as i32, tile_height as i32);
    let min = DataTilePos::new(view.x().div_euclid(tw), view.y().div_euclid(th));
    let max = DataTilePos::new(
        (view.max_x() - 1).div_euclid(tw),
        (view.max_y() - 1).div_euclid(th),
    );
    (min, max)
}

/// Builds an op that assembles native-grid rasters from a raster source.
///
/// Views passed to the op are in the source's native grid. All overlapping
/// tiles load concurrently. Cells covered by missing tiles keep the default
/// value and the op is absent only when no tile at all is present. A tile
/// that fails to load is logged and treated as missing.
pub fn sample_raster<S, T>(source: Arc<S>) -> DataOp<Raster<T>>
where
    S: TiledDataSource<Tile = Raster<T>>,
    T: Copy + Default + Send + Sync + 'static,
{
    let tiles: Cache<DataTilePos, Option<Arc<Raster<T>>>> = Cache::builder()
        .max_capacity(DECODED_TILE_CAPACITY)
        .time_to_idle(DECODED_TILE_IDLE)
        .build();

    DataOp::of(move |view: DataView| {
        let source = Arc::clone(&source);
        let tiles = tiles.clone();
        async move {
            if view.is_empty() {
                return Ok(None);
            }

            let (tw, th) = (source.tile_width(), source.tile_height());
            let (min, max) = tiles_in_native_view(&view, tw, th);

            let mut positions = Vec::new();
            for tile_z in min.tile_z..=max.tile_z {
                for tile_x in min.tile_x..=max.tile_x {
                    positions.push(DataTilePos::new(tile_x, tile_z));
                }
            }
            trace!(
                source = source.name(),
                view = %view,
                tiles = positions.len(),
                "Sampling tiles"
            );

            let loads = positions.iter().map(|&pos| {
                let source = Arc::clone(&source);
                let tiles = tiles.clone();
                async move {
                    let tile = tiles
                        .try_get_with(pos, async move {
                            source.load(pos).await.map(|tile| tile.map(Arc::new))
                        })
                        .await;
                    (pos, tile)
                }
            });

            let mut out = Raster::for_view(&view);
            let mut present = 0usize;
            for (pos, tile) in join_all(loads).await {
                match tile {
                    Ok(Some(tile)) => {
                        let tile_view = DataView::rect(
                            pos.tile_x * tw as i32,
                            pos.tile_z * th as i32,
                            tile.width(),
                            tile.height(),
                        );
                        out.copy_from(&view, &tile, &tile_view);
                        present += 1;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!(
                            source = source.name(),
                            tile = %pos,
                            error = %e,
                            "Tile unavailable - treating as missing"
                        );
                    }
                }
            }

            Ok::<_, DataError>((present > 0).then_some(out))
        }
    })
}
