//! OpenStreetMap area tiles.
//!
//! Each tile is a gzip JSON document of polygons whose points are relative
//! to the tile's own origin on the OSM native grid:
//!
//! ```json
//! { "areas": [ { "kind": "water", "rings": [[[0.0, 0.0], [12.5, 0.0], [12.5, 9.0]]] } ] }
//! ```
//!
//! Loaded tiles carry absolute native coordinates so tiles can be merged.

use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use super::cache::TileCache;
use super::codec::decompress;
use super::http::TileClient;
use super::index::RemoteIndex;
use super::tiled::{fetch_decoded, TiledDataSource};
use crate::coord::{tiles_covering, CoordinateReference, DataTilePos, DataView};
use crate::dataop::DataOp;
use crate::dataop::WorkerPool;
use crate::error::{DataError, DataResult};
use crate::world::WorldScale;

pub const DATASET: &str = "osm";

/// Native cells per OSM tile edge (one arc-second cells, 1/8° tiles).
pub const TILE_SIZE: usize = 450;
pub const GLOBAL_WIDTH: usize = 1_296_000;
pub const GLOBAL_HEIGHT: usize = 648_000;

/// Blocks of margin sampled around a view so features just outside it are
/// still considered.
pub const SAMPLE_MARGIN: i32 = 16;

/// Feature class of an area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaKind {
    Water,
    Wetland,
    Glacier,
    #[serde(other)]
    Other,
}

/// A polygon with optional holes, in native OSM grid coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Area {
    pub kind: AreaKind,
    pub rings: Vec<Vec<(f64, f64)>>,
}

impl Area {
    fn translated(mut self, dx: f64, dz: f64) -> Self {
        for ring in &mut self.rings {
            for point in ring.iter_mut() {
                point.0 += dx;
                point.1 += dz;
            }
        }
        self
    }
}

/// Areas of one or more merged tiles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OsmTile {
    pub areas: Vec<Area>,
}

impl OsmTile {
    /// Decodes a gzip tile payload, translating points from tile-local to
    /// absolute native coordinates.
    pub fn decode(payload: &[u8], origin: (f64, f64)) -> Result<Self, DataError> {
        let json = decompress(payload)?;
        let tile: OsmTile =
            serde_json::from_slice(&json).map_err(|e| DataError::decode(format!("osm tile: {}", e)))?;

        Ok(Self {
            areas: tile
                .areas
                .into_iter()
                .map(|area| area.translated(origin.0, origin.1))
                .collect(),
        })
    }

    /// Appends another tile's areas.
    pub fn merge(mut self, other: OsmTile) -> Self {
        self.areas.extend(other.areas);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    /// Areas of one kind.
    pub fn areas_of(&self, kind: AreaKind) -> impl Iterator<Item = &Area> + '_ {
        self.areas.iter().filter(move |area| area.kind == kind)
    }
}

/// OSM area tiles.
pub struct OsmSource<C> {
    crs: CoordinateReference,
    cache: TileCache<C>,
    index: Option<Arc<RemoteIndex>>,
    pool: WorkerPool,
    tile_size: usize,
}

impl<C: TileClient> OsmSource<C> {
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

impl<C: TileClient> TiledDataSource for OsmSource<C> {
    type Tile = OsmTile;

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

    async fn load(&self, pos: DataTilePos) -> DataResult<OsmTile> {
        let size = self.tile_size as f64;
        let origin = (pos.tile_x as f64 * size, pos.tile_z as f64 * size);
        fetch_decoded(
            &self.cache,
            self.index.as_deref(),
            DATASET,
            pos,
            &self.pool,
            move |payload| OsmTile::decode(payload, origin),
        )
        .await
    }
}

/// Builds an op over block-space views that merges every OSM tile touching
/// the view plus a [`SAMPLE_MARGIN`] block border.
///
/// Absent when no tile in range is present. Tiles that fail to load are
/// logged and skipped.
pub fn sample_tiles<S>(source: Arc<S>) -> DataOp<OsmTile>
where
    S: TiledDataSource<Tile = OsmTile>,
{
    DataOp::of(move |view: DataView| {
        let source = Arc::clone(&source);
        async move {
            let buffered = view.grow(SAMPLE_MARGIN, SAMPLE_MARGIN, SAMPLE_MARGIN, SAMPLE_MARGIN);
            let (min, max) = tiles_covering(
                &buffered,
                &source.crs(),
                source.tile_width() as f64,
                source.tile_height() as f64,
            );

            let mut positions = Vec::new();
            for tile_z in min.tile_z..=max.tile_z {
                for tile_x in min.tile_x..=max.tile_x {
                    positions.push(DataTilePos::new(tile_x, tile_z));
                }
            }
            trace!(view = %view, tiles = positions.len(), "Sampling OSM tiles");

            let loads = positions.iter().map(|&pos| {
                let source = Arc::clone(&source);
                async move { (pos, source.load(pos).await) }
            });

            let mut merged: Option<OsmTile> = None;
            for (pos, result) in join_all(loads).await {
                match result {
                    Ok(Some(tile)) => {
                        merged = Some(match merged {
                            Some(acc) => acc.merge(tile),
                            None => tile,
                        });
                    }
                    Ok(None) => {}
                    Err(e) => warn!(tile = %pos, error = %e, "OSM tile unavailable - skipping"),
                }
            }

            Ok::<_, DataError>(merged)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::codec::compress;

    #[test]
    fn test_decode_translates_to_absolute() {
        let json = br#"{ "areas": [ { "kind": "water", "rings": [[[1.0, 2.0], [3.0, 2.0], [3.0, 4.0]]] } ] }"#;
        let payload = compress(json).unwrap();

        let tile = OsmTile::decode(&payload, (900.0, 450.0)).unwrap();
        assert_eq!(tile.areas.len(), 1);
        assert_eq!(tile.areas[0].kind, AreaKind::Water);
        assert_eq!(tile.areas[0].rings[0][0], (901.0, 452.0));
    }

    #[test]
    fn test_unknown_kind_is_other() {
        let json = br#"{ "areas": [ { "kind": "parking", "rings": [] } ] }"#;
        let tile = OsmTile::decode(&compress(json).unwrap(), (0.0, 0.0)).unwrap();
        assert_eq!(tile.areas[0].kind, AreaKind::Other);
    }

    #[test]
    fn test_bad_json_is_decode_error() {
        let payload = compress(b"[1, 2").unwrap();
        assert!(matches!(
            OsmTile::decode(&payload, (0.0, 0.0)),
            Err(DataError::Decode(_))
        ));
    }

    #[test]
    fn test_merge_and_filter() {
        let water = Area {
            kind: AreaKind::Water,
            rings: vec![],
        };
        let glacier = Area {
            kind: AreaKind::Glacier,
            rings: vec![],
        };
        let merged = OsmTile {
            areas: vec![water],
        }
        .merge(OsmTile {
            areas: vec![glacier],
        });

        assert_eq!(merged.areas.len(), 2);
        assert_eq!(merged.areas_of(AreaKind::Water).count(), 1);
    }
}
