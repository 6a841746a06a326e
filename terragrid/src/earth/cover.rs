//! Land cover classes.

use std::fmt;

/// Land cover class of a cell, using the ESA CCI class ids.
///
/// Ids that are not listed here decode to [`Cover::No`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Cover {
    #[default]
    No = 0,
    RainfedCropland = 10,
    HerbaceousCropland = 11,
    TreeCropland = 12,
    IrrigatedCropland = 20,
    CroplandMosaic = 30,
    NaturalVegetationMosaic = 40,
    BroadleafEvergreen = 50,
    BroadleafDeciduous = 60,
    NeedleleafEvergreen = 70,
    NeedleleafDeciduous = 80,
    MixedLeafType = 90,
    TreeShrubMosaic = 100,
    HerbaceousMosaic = 110,
    Shrubland = 120,
    Grassland = 130,
    LichensAndMosses = 140,
    SparseVegetation = 150,
    FreshFloodedForest = 160,
    SalineFloodedForest = 170,
    FloodedVegetation = 180,
    Urban = 190,
    BareArea = 200,
    Water = 210,
    PermanentSnow = 220,
}

impl Cover {
    const ALL: [Cover; 25] = [
        Cover::No,
        Cover::RainfedCropland,
        Cover::HerbaceousCropland,
        Cover::TreeCropland,
        Cover::IrrigatedCropland,
        Cover::CroplandMosaic,
        Cover::NaturalVegetationMosaic,
        Cover::BroadleafEvergreen,
        Cover::BroadleafDeciduous,
        Cover::NeedleleafEvergreen,
        Cover::NeedleleafDeciduous,
        Cover::MixedLeafType,
        Cover::TreeShrubMosaic,
        Cover::HerbaceousMosaic,
        Cover::Shrubland,
        Cover::Grassland,
        Cover::LichensAndMosses,
        Cover::SparseVegetation,
        Cover::FreshFloodedForest,
        Cover::SalineFloodedForest,
        Cover::FloodedVegetation,
        Cover::Urban,
        Cover::BareArea,
        Cover::Water,
        Cover::PermanentSnow,
    ];

    /// Decodes a raw class id.
    pub fn from_id(id: u8) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|cover| cover.id() == id)
            .unwrap_or_default()
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn is_water(self) -> bool {
        self == Cover::Water
    }

    pub fn is_forest(self) -> bool {
        matches!(
            self,
            Cover::BroadleafEvergreen
                | Cover::BroadleafDeciduous
                | Cover::NeedleleafEvergreen
                | Cover::NeedleleafDeciduous
                | Cover::MixedLeafType
                | Cover::FreshFloodedForest
                | Cover::SalineFloodedForest
        )
    }

    pub fn is_flooded(self) -> bool {
        matches!(
            self,
            Cover::FreshFloodedForest | Cover::SalineFloodedForest | Cover::FloodedVegetation
        )
    }
}

impl fmt::Display for Cover {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
