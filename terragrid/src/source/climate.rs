//! Global climate raster.
//!
//! One gzip payload holding three consecutive `WIDTH`×`HEIGHT` tables of
//! packed bytes: mean temperature, minimum temperature and annual rainfall.
//! Values are unpacked as `min + range * (packed / 255) ^ curve`.

use std::sync::Arc;

use tracing::{info, warn};

use super::cache::{TileCache, TileKey};
use super::codec::decompress;
use super::http::TileClient;
use super::index::RemoteIndex;
use crate::coord::{DataTilePos, DataView};
use crate::dataop::{DataOp, WorkerPool};
use crate::error::DataError;
use crate::raster::{FloatRaster, Raster, ShortRaster};
use crate::world::WorldScale;

pub const WIDTH: usize = 4320;
pub const HEIGHT: usize = 2160;

/// Value reported outside the raster, in °C.
pub const STANDARD_TEMPERATURE: f32 = 14.0;
/// Value reported outside the raster, in mm.
pub const STANDARD_RAINFALL: i16 = 600;

const PACK_RANGE: f64 = 255.0;

const TEMP_MIN: f64 = -40.0;
const TEMP_MAX: f64 = 45.0;
const TEMP_CURVE: f64 = 1.0;

const RAIN_MIN: f64 = 0.0;
const RAIN_RANGE: f64 = 7200.0;
const RAIN_CURVE: f64 = 2.3;

/// Dataset name used for the cached payload.
pub const DATASET: &str = "climate";

/// Which temperature table to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Temperature {
    Mean,
    Min,
}

/// Decoded global climate tables.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldClimateRaster {
    width: usize,
    height: usize,
    mean_temperature: Vec<u8>,
    min_temperature: Vec<u8>,
    annual_rainfall: Vec<u8>,
}

impl WorldClimateRaster {
    /// Decodes a full-size gzip climate payload.
    pub fn parse(payload: &[u8]) -> Result<Self, DataError> {
        Self::parse_sized(payload, WIDTH, HEIGHT)
    }

    /// Decodes a gzip climate payload of the given table size.
    pub fn parse_sized(payload: &[u8], width: usize, height: usize) -> Result<Self, DataError> {
        let data = decompress(payload)?;
        let table = width * height;
        if data.len() < table * 3 {
            return Err(DataError::decode(format!(
                "short climate payload: expected {} bytes, got {}",
                table * 3,
                data.len()
            )));
        }

        Ok(Self {
            width,
            height,
            mean_temperature: data[..table].to_vec(),
            min_temperature: data[table..table * 2].to_vec(),
            annual_rainfall: data[table * 2..table * 3].to_vec(),
        })
    }

    /// Fetches the climate payload named by the remote index through the
    /// tile cache and decodes it on `pool`.
    ///
    /// Any failure is logged and yields `None`; climate keys are then absent
    /// for the session.
    pub async fn load<C: TileClient>(
        cache: &TileCache<C>,
        index: Option<&RemoteIndex>,
        pool: &WorkerPool,
    ) -> Option<Arc<Self>> {
        let url = index.and_then(|i| i.climate_url()).map(str::to_string);
        let key = TileKey::new(DATASET, DataTilePos::new(0, 0));

        let payload = match cache.load(key, url).await {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                warn!("Climate raster unavailable - climate data will be absent");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "Failed to load climate raster");
                return None;
            }
        };

        match pool.run(move || Self::parse(&payload)).await {
            Ok(Ok(raster)) => {
                info!(width = raster.width, height = raster.height, "Loaded climate raster");
                Some(Arc::new(raster))
            }
            Ok(Err(e)) | Err(e) => {
                warn!(error = %e, "Failed to decode climate raster");
                None
            }
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    fn index(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        Some(x as usize + y as usize * self.width)
    }

    pub fn mean_temperature(&self, x: i64, y: i64) -> f32 {
        self.index(x, y)
            .map_or(STANDARD_TEMPERATURE, |i| unpack_temperature(self.mean_temperature[i]))
    }

    pub fn min_temperature(&self, x: i64, y: i64) -> f32 {
        self.index(x, y)
            .map_or(STANDARD_TEMPERATURE, |i| unpack_temperature(self.min_temperature[i]))
    }

    pub fn annual_rainfall(&self, x: i64, y: i64) -> i16 {
        self.index(x, y)
            .map_or(STANDARD_RAINFALL, |i| unpack_rainfall(self.annual_rainfall[i]))
    }

    /// Coordinate reference of this raster's grid.
    pub fn crs(&self, world: &WorldScale) -> crate::coord::CoordinateReference {
        world.crs_for(self.width as f64, self.height as f64)
    }

    fn sample_f32(&self, view: &DataView, read: impl Fn(&Self, i64, i64) -> f32) -> FloatRaster {
        let mut raster = Raster::for_view(view);
        for y in 0..view.height() {
            for x in 0..view.width() {
                let gx = view.x() as i64 + x as i64;
                let gy = view.y() as i64 + y as i64;
                raster.set(x, y, read(self, gx, gy));
            }
        }
        raster
    }

    /// Op over native-grid views producing a temperature raster.
    pub fn temperature_op(self: &Arc<Self>, which: Temperature) -> DataOp<FloatRaster> {
        let climate = Arc::clone(self);
        DataOp::of_sync(move |view: &DataView| match which {
            Temperature::Mean => climate.sample_f32(view, Self::mean_temperature),
            Temperature::Min => climate.sample_f32(view, Self::min_temperature),
        })
    }

    /// Op over native-grid views producing an annual rainfall raster.
    pub fn rainfall_op(self: &Arc<Self>) -> DataOp<ShortRaster> {
        let climate = Arc::clone(self);
        DataOp::of_sync(move |view: &DataView| {
            let mut raster = Raster::for_view(view);
            for y in 0..view.height() {
                for x in 0..view.width() {
                    let gx = view.x() as i64 + x as i64;
                    let gy = view.y() as i64 + y as i64;
                    raster.set(x, y, climate.annual_rainfall(gx, gy));
                }
            }
            raster
        })
    }
}

fn unpack_temperature(packed: u8) -> f32 {
    let unpacked = (TEMP_MAX - TEMP_MIN) * (packed as f64 / PACK_RANGE).powf(TEMP_CURVE);
    (TEMP_MIN + unpacked) as f32
}

fn unpack_rainfall(packed: u8) -> i16 {
    let unpacked = RAIN_RANGE * (packed as f64 / PACK_RANGE).powf(RAIN_CURVE);
    (RAIN_MIN + unpacked) as i16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::codec::compress;

    fn tiny() -> WorldClimateRaster {
        // 2x1 tables: mean [0, 255], min [51, 102], rain [0, 255]
        let payload = compress(&[0, 255, 51, 102, 0, 255]).unwrap();
        WorldClimateRaster::parse_sized(&payload, 2, 1).unwrap()
    }

    #[test]
    fn test_unpack_ranges() {
        assert_eq!(unpack_temperature(0), -40.0);
        assert_eq!(unpack_temperature(255), 45.0);
        assert_eq!(unpack_rainfall(0), 0);
        assert_eq!(unpack_rainfall(255), 7200);
    }

    #[test]
    fn test_rainfall_curve() {
        // Half the packed range is well below half the rainfall range
        let half = unpack_rainfall(128);
        assert!(half > 0 && half < 3600);
    }

    #[test]
    fn test_reads_each_table() {
        let climate = tiny();
        assert_eq!(climate.mean_temperature(1, 0), 45.0);
        assert!((climate.min_temperature(0, 0) - (-23.0)).abs() < 1e-4);
        assert_eq!(climate.annual_rainfall(1, 0), 7200);
    }

    #[test]
    fn test_out_of_bounds_standard_values() {
        let climate = tiny();
        assert_eq!(climate.mean_temperature(-1, 0), STANDARD_TEMPERATURE);
        assert_eq!(climate.min_temperature(2, 0), STANDARD_TEMPERATURE);
        assert_eq!(climate.annual_rainfall(0, 1), STANDARD_RAINFALL);
    }

    #[test]
    fn test_short_payload_rejected() {
        let payload = compress(&[1, 2, 3]).unwrap();
        let result = WorldClimateRaster::parse_sized(&payload, 2, 1);
        assert!(matches!(result, Err(DataError::Decode(_))));
    }

    #[tokio::test]
    async fn test_ops_sample_native_views() {
        let climate = Arc::new(tiny());
        let view = DataView::rect(-1, 0, 3, 1);

        let mean = climate
            .temperature_op(Temperature::Mean)
            .apply(view)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(mean.data(), &[STANDARD_TEMPERATURE, -40.0, 45.0]);

        let rain = climate.rainfall_op().apply(view).await.unwrap().unwrap();
        assert_eq!(rain.data(), &[STANDARD_RAINFALL, 0, 7200]);
    }
}
