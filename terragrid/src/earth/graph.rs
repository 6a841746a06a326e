//! The earth product graph.
//!
//! ```text
//! ElevationSource ─ sample_raster ─ VoronoiScaleOp ─┐
//! LandCoverSource ─ sample_raster ─ VoronoiScaleOp ─┼─ join3 ─ Landform
//! OsmSource ─ sample_tiles ─ rasterize (pool) ──────┘
//! WorldClimateRaster ─ VoronoiScaleOp ─ temperatures, rainfall
//! ```
//!
//! Every op here takes block-space views. The resampled ops are memoized so
//! the landform join and the column keys share one evaluation per view.

use std::sync::Arc;

use super::context::EarthContext;
use super::cover::Cover;
use super::landform::{classify_raster, Landform};
use crate::column::{keys, ColumnDataGenerator};
use crate::coord::CoordinateReference;
use crate::dataop::{join3, DataOp, MemoConfig, WorkerPool};
use crate::raster::rasterize::{fill_rings_into, Ring};
use crate::raster::{BitRaster, EnumRaster, FloatRaster, Raster, Sampler, ShortRaster};
use crate::resample::VoronoiScaleOp;
use crate::source::{
    sample_raster, sample_tiles, AreaKind, ElevationSource, LandCoverSource, OsmSource, OsmTile,
    Temperature, TileClient, TiledDataSource,
};

/// Sea level, used where elevation is missing.
const DEFAULT_ELEVATION: i16 = 0;

/// All ops of the earth graph.
#[derive(Debug, Clone)]
pub struct EarthOps {
    pub elevation: DataOp<ShortRaster>,
    pub cover: DataOp<EnumRaster<Cover>>,
    pub landform: DataOp<EnumRaster<Landform>>,
    pub min_temperature: DataOp<FloatRaster>,
    pub mean_temperature: DataOp<FloatRaster>,
    pub annual_rainfall: DataOp<ShortRaster>,
    pub water: DataOp<BitRaster>,
}

impl EarthOps {
    /// Wires the graph from the session context.
    pub fn build<C: TileClient>(ctx: &EarthContext<C>, memo: MemoConfig) -> Self {
        let world = ctx.world();
        let index = ctx.index().cloned();

        let elevation_source = Arc::new(ElevationSource::new(
            world,
            ctx.cache().clone(),
            index.clone(),
            ctx.pool().clone(),
        ));
        let cover_source = Arc::new(LandCoverSource::new(
            world,
            ctx.cache().clone(),
            index.clone(),
            ctx.pool().clone(),
        ));
        let osm_source = Arc::new(OsmSource::new(
            world,
            ctx.cache().clone(),
            index,
            ctx.pool().clone(),
        ));

        let elevation = resampled(&elevation_source).cached_with(memo, Raster::clone);
        let cover = resampled(&cover_source)
            .map(|ids, _| ids.map(Cover::from_id))
            .cached_with(memo, Raster::clone);
        let water = water_op(osm_source, ctx.pool()).cached_with(memo, Raster::clone);
        let landform = landform_op(&elevation, &cover, &water);

        let (min_temperature, mean_temperature, annual_rainfall) = match ctx.climate() {
            Some(climate) => {
                let crs = climate.crs(world);
                (
                    VoronoiScaleOp::scale_from(climate.temperature_op(Temperature::Min), crs),
                    VoronoiScaleOp::scale_from(climate.temperature_op(Temperature::Mean), crs),
                    VoronoiScaleOp::scale_from(climate.rainfall_op(), crs),
                )
            }
            None => (DataOp::absent(), DataOp::absent(), DataOp::absent()),
        };

        Self {
            elevation,
            cover,
            landform,
            min_temperature,
            mean_temperature,
            annual_rainfall,
            water,
        }
    }

    /// Registers every op under its column key.
    pub fn into_generator(self) -> ColumnDataGenerator {
        ColumnDataGenerator::new()
            .with::<keys::Elevation>(self.elevation)
            .with::<keys::Cover>(self.cover)
            .with::<keys::Landform>(self.landform)
            .with::<keys::MinTemperature>(self.min_temperature)
            .with::<keys::MeanTemperature>(self.mean_temperature)
            .with::<keys::AnnualRainfall>(self.annual_rainfall)
            .with::<keys::Water>(self.water)
    }
}

/// Builds the full earth column generator.
pub fn earth_generator<C: TileClient>(ctx: &EarthContext<C>, memo: MemoConfig) -> ColumnDataGenerator {
    EarthOps::build(ctx, memo).into_generator()
}

fn resampled<S, T>(source: &Arc<S>) -> DataOp<Raster<T>>
where
    S: TiledDataSource<Tile = Raster<T>>,
    T: Copy + Default + Send + Sync + 'static,
{
    let crs = source.crs();
    VoronoiScaleOp::scale_from(sample_raster(Arc::clone(source)), crs)
}

/// Rasterizes OSM water areas onto block views.
pub fn water_op<S>(source: Arc<S>, pool: &WorkerPool) -> DataOp<BitRaster>
where
    S: TiledDataSource<Tile = OsmTile>,
{
    let crs = source.crs();
    sample_tiles(source).map_blocking(pool, move |tile, view| {
        let mut raster = Raster::for_view(view);
        for area in tile.areas_of(AreaKind::Water) {
            let rings: Vec<Ring> = area
                .rings
                .iter()
                .map(|ring| to_block_ring(ring, &crs))
                .collect();
            fill_rings_into(&mut raster, view, &rings);
        }
        raster
    })
}

fn to_block_ring(ring: &[(f64, f64)], crs: &CoordinateReference) -> Ring {
    ring.iter()
        .map(|&(x, z)| (crs.block_x(x), crs.block_z(z)))
        .collect()
}

/// Landform from cover, with elevation and mapped water where available.
///
/// Only absent when cover is absent. Missing elevation reads as sea level
/// and missing water areas as dry land.
pub fn landform_op(
    elevation: &DataOp<ShortRaster>,
    cover: &DataOp<EnumRaster<Cover>>,
    water: &DataOp<BitRaster>,
) -> DataOp<EnumRaster<Landform>> {
    let elevation = Sampler::new(elevation.clone(), DEFAULT_ELEVATION).into_op();
    let water = Sampler::new(water.clone(), false).into_op();

    join3(&elevation, cover, &water)
        .map(|(elevation, cover, water), _| classify_raster(&elevation, &cover, &water))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::{ColumnPos, DataView};
    use crate::source::codec::compress;
    use crate::source::http::mock::MockClient;
    use crate::source::{TileCache, WorldClimateRaster};
    use crate::world::WorldScale;
    use tempfile::TempDir;

    fn context(temp: &TempDir) -> EarthContext<MockClient> {
        EarthContext::new(
            WorldScale::default(),
            TileCache::new(temp.path(), Arc::new(MockClient::new())),
            WorkerPool::new(2, "test"),
        )
    }

    /// A 4×2 climate raster with every packed byte equal to `packed`.
    fn uniform_climate(packed: u8) -> WorldClimateRaster {
        let payload = compress(&[packed; 4 * 2 * 3]).unwrap();
        WorldClimateRaster::parse_sized(&payload, 4, 2).unwrap()
    }

    #[tokio::test]
    async fn test_no_index_leaves_tiled_keys_absent() {
        let temp = TempDir::new().unwrap();
        let ops = EarthOps::build(&context(&temp), MemoConfig::default());
        let view = DataView::of_column(ColumnPos::new(0, 0));

        assert_eq!(ops.elevation.apply(view).await, Ok(None));
        assert_eq!(ops.cover.apply(view).await, Ok(None));
        assert_eq!(ops.landform.apply(view).await, Ok(None));
        assert_eq!(ops.water.apply(view).await, Ok(None));
        assert_eq!(ops.mean_temperature.apply(view).await, Ok(None));
    }

    #[tokio::test]
    async fn test_climate_is_resampled_to_view() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp).with_climate(uniform_climate(255));
        let ops = EarthOps::build(&ctx, MemoConfig::default());
        let view = DataView::of_column(ColumnPos::new(5, -3));

        let mean = ops.mean_temperature.apply(view).await.unwrap().unwrap();
        assert_eq!((mean.width(), mean.height()), (16, 16));
        assert!(mean.data().iter().all(|&t| (t - 45.0).abs() < 1e-4));

        let rain = ops.annual_rainfall.apply(view).await.unwrap().unwrap();
        assert!(rain.data().iter().all(|&r| r == 7200));
    }

    #[test]
    fn test_generator_registers_every_key() {
        let temp = TempDir::new().unwrap();
        let generator = earth_generator(&context(&temp), MemoConfig::default());
        assert_eq!(generator.len(), 7);
    }

    #[tokio::test]
    async fn test_landform_falls_back_without_elevation() {
        let cover = DataOp::of_sync(|view: &DataView| {
            let mut raster = Raster::filled(view.width(), view.height(), Cover::Grassland);
            raster.set(0, 0, Cover::Water);
            raster
        });
        let landform = landform_op(&DataOp::absent(), &cover, &DataOp::absent());

        let raster = landform
            .apply(DataView::square(0, 0, 4))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(raster.get(0, 0), Landform::Sea);
        assert_eq!(raster.get(1, 0), Landform::Land);
    }

    #[tokio::test]
    async fn test_landform_absent_without_cover() {
        let elevation = DataOp::of_sync(|view: &DataView| Raster::new(view.width(), view.height()));
        let landform = landform_op(&elevation, &DataOp::absent(), &DataOp::absent());

        assert_eq!(landform.apply(DataView::square(0, 0, 4)).await, Ok(None));
    }

    #[tokio::test]
    async fn test_water_op_rasterizes_in_block_space() {
        struct OneLake {
            crs: CoordinateReference,
        }

        impl TiledDataSource for OneLake {
            type Tile = OsmTile;

            fn name(&self) -> &str {
                "lake"
            }

            fn crs(&self) -> CoordinateReference {
                self.crs
            }

            fn tile_width(&self) -> usize {
                64
            }

            fn tile_height(&self) -> usize {
                64
            }

            async fn load(&self, pos: crate::coord::DataTilePos) -> crate::error::DataResult<OsmTile> {
                if pos != crate::coord::DataTilePos::new(0, 0) {
                    return Ok(None);
                }
                let lake = crate::source::Area {
                    kind: AreaKind::Water,
                    rings: vec![vec![(1.0, 1.0), (3.0, 1.0), (3.0, 3.0), (1.0, 3.0)]],
                };
                Ok(Some(OsmTile { areas: vec![lake] }))
            }
        }

        // Two blocks per native cell
        let source = Arc::new(OneLake {
            crs: CoordinateReference::scale(2.0, 2.0),
        });
        let water = water_op(source, &WorkerPool::new(1, "test"));

        let raster = water
            .apply(DataView::square(0, 0, 8))
            .await
            .unwrap()
            .unwrap();
        assert!(raster.get(2, 2));
        assert!(raster.get(5, 5));
        assert!(!raster.get(1, 2));
        assert!(!raster.get(6, 6));
        assert_eq!(raster.data().iter().filter(|&&v| v).count(), 16);
    }
}
