//! Coarse landform classification.

use std::fmt;

use super::cover::Cover;
use crate::raster::{BitRaster, EnumRaster, ShortRaster};

/// What kind of surface a cell is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Landform {
    #[default]
    Land,
    Sea,
    LakeOrRiver,
}

impl Landform {
    /// Classifies one cell.
    ///
    /// Water cover at or below sea level is sea and above it is inland
    /// water. Mapped water areas are inland water unless already sea.
    pub fn classify(elevation: i16, cover: Cover, mapped_water: bool) -> Self {
        match (cover.is_water(), elevation <= 0) {
            (true, true) => Landform::Sea,
            (true, false) => Landform::LakeOrRiver,
            (false, _) if mapped_water => Landform::LakeOrRiver,
            (false, _) => Landform::Land,
        }
    }

    pub fn is_water(self) -> bool {
        !matches!(self, Landform::Land)
    }
}

impl fmt::Display for Landform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Landform::Land => write!(f, "land"),
            Landform::Sea => write!(f, "sea"),
            Landform::LakeOrRiver => write!(f, "lake_or_river"),
        }
    }
}

/// Classifies every cell of same-sized rasters.
pub fn classify_raster(
    elevation: &ShortRaster,
    cover: &EnumRaster<Cover>,
    water: &BitRaster,
) -> EnumRaster<Landform> {
    let mut out = EnumRaster::new(cover.width(), cover.height());
    for (x, y, class) in cover.iter() {
        let height = elevation.try_get(x as i64, y as i64).unwrap_or(0);
        let mapped = water.try_get(x as i64, y as i64).unwrap_or(false);
        out.set(x, y, Landform::classify(height, class, mapped));
    }
    out
}
