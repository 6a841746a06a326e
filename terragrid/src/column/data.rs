//! The immutable per-column data bundle.

use std::fmt;
use std::sync::Arc;

use super::keys::DataKey;
use crate::coord::{ColumnPos, DataView};
use crate::earth::{Cover, Landform};
use crate::raster::{BitRaster, EnumRaster, FloatRaster, ShortRaster};

/// State of one key in a [`ColumnData`].
pub enum Slot<T> {
    /// No op was registered for the key.
    Unregistered,
    /// The key's op resolved; `None` means its data is absent for the column.
    Computed(Option<Arc<T>>),
}

impl<T> Slot<T> {
    pub fn is_registered(&self) -> bool {
        matches!(self, Self::Computed(_))
    }
}

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Unregistered => Self::Unregistered,
            Self::Computed(value) => Self::Computed(value.clone()),
        }
    }
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self::Unregistered
    }
}

impl<T> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unregistered => write!(f, "Unregistered"),
            Self::Computed(Some(_)) => write!(f, "Present"),
            Self::Computed(None) => write!(f, "Absent"),
        }
    }
}

/// All derived data for one chunk column.
///
/// Built in one piece by the generator once every registered op has
/// resolved, then shared read-only. Read values with [`ColumnData::get`]:
///
/// ```
/// use terragrid::column::{keys, ColumnData};
/// use terragrid::coord::ColumnPos;
///
/// let data = ColumnData::empty(ColumnPos::new(0, 0));
/// assert!(!data.is_registered::<keys::Elevation>());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ColumnData {
    pos: ColumnPos,
    pub(super) elevation: Slot<ShortRaster>,
    pub(super) cover: Slot<EnumRaster<Cover>>,
    pub(super) landform: Slot<EnumRaster<Landform>>,
    pub(super) min_temperature: Slot<FloatRaster>,
    pub(super) mean_temperature: Slot<FloatRaster>,
    pub(super) annual_rainfall: Slot<ShortRaster>,
    pub(super) water: Slot<BitRaster>,
}

impl ColumnData {
    /// A bundle with every key unregistered.
    pub fn empty(pos: ColumnPos) -> Self {
        Self {
            pos,
            ..Default::default()
        }
    }

    pub fn pos(&self) -> ColumnPos {
        self.pos
    }

    /// The block-space view the bundle covers.
    pub fn view(&self) -> DataView {
        DataView::of_column(self.pos)
    }

    /// Returns the value for `K`, or `None` if it is absent for this column.
    ///
    /// # Panics
    ///
    /// Panics if no op was registered for `K`. Reading a key the generator
    /// never produces is a wiring bug.
    pub fn get<K: DataKey>(&self) -> Option<&Arc<K::Value>> {
        match K::slot(self) {
            Slot::Computed(value) => value.as_ref(),
            Slot::Unregistered => panic!(
                "column data key `{}` is not registered (column {})",
                K::NAME,
                self.pos
            ),
        }
    }

    pub fn is_registered<K: DataKey>(&self) -> bool {
        K::slot(self).is_registered()
    }

    /// Stores a computed value. Used while assembling.
    pub(super) fn put<K: DataKey>(&mut self, value: Option<Arc<K::Value>>) {
        *K::slot_mut(self) = Slot::Computed(value);
    }

    /// Registered keys with whether each is present, in declaration order.
    pub fn summary(&self) -> Vec<(&'static str, bool)> {
        fn entry<T>(name: &'static str, slot: &Slot<T>) -> Option<(&'static str, bool)> {
            match slot {
                Slot::Unregistered => None,
                Slot::Computed(value) => Some((name, value.is_some())),
            }
        }

        [
            entry("elevation", &self.elevation),
            entry("cover", &self.cover),
            entry("landform", &self.landform),
            entry("min_temperature", &self.min_temperature),
            entry("mean_temperature", &self.mean_temperature),
            entry("annual_rainfall", &self.annual_rainfall),
            entry("water", &self.water),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}
