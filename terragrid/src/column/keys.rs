//! Typed keys into [`ColumnData`].
//!
//! Each key is a zero-sized marker naming one slot of the bundle and the
//! value type stored there.

use super::data::{ColumnData, Slot};
use crate::raster::{BitRaster, EnumRaster, FloatRaster, ShortRaster};

/// A statically known column data key.
pub trait DataKey: Send + Sync + 'static {
    type Value: Send + Sync + 'static;

    /// Stable name for logs and summaries.
    const NAME: &'static str;

    fn slot(data: &ColumnData) -> &Slot<Self::Value>;

    fn slot_mut(data: &mut ColumnData) -> &mut Slot<Self::Value>;
}

macro_rules! data_key {
    ($(#[$doc:meta])* $key:ident, $field:ident, $value:ty) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $key;

        impl DataKey for $key {
            type Value = $value;
            const NAME: &'static str = stringify!($field);

            fn slot(data: &ColumnData) -> &Slot<$value> {
                &data.$field
            }

            fn slot_mut(data: &mut ColumnData) -> &mut Slot<$value> {
                &mut data.$field
            }
        }
    };
}

data_key!(
    /// Metres above sea level.
    Elevation, elevation, ShortRaster
);
data_key!(
    /// Land cover classification.
    Cover, cover, EnumRaster<crate::earth::Cover>
);
data_key!(Landform, landform, EnumRaster<crate::earth::Landform>);
data_key!(
    /// Minimum monthly temperature, °C.
    MinTemperature, min_temperature, FloatRaster
);
data_key!(
    /// Mean annual temperature, °C.
    MeanTemperature, mean_temperature, FloatRaster
);
data_key!(
    /// Annual rainfall, millimetres.
    AnnualRainfall, annual_rainfall, ShortRaster
);
data_key!(
    /// Cells inside mapped water areas.
    Water, water, BitRaster
);
