//! Remote dataset index.
//!
//! A small JSON document, fetched once per session, that tells the tiled
//! sources where each dataset's tiles live:
//!
//! ```json
//! {
//!   "datasets": {
//!     "landcover": { "url": "https://example.org/landcover/{x}/{z}.gz", "tiles": [[36, 4]] },
//!     "elevation": { "url": "https://example.org/elevation/{x}/{z}.gz" }
//!   },
//!   "climate": "https://example.org/climate.gz"
//! }
//! ```
//!
//! `tiles` is optional; when present, only the listed tiles exist remotely.
//! `climate` points at the single global climate raster.

use std::collections::{HashMap, HashSet};

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use super::http::TileClient;
use crate::coord::DataTilePos;

/// Errors raised while reading the remote index.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("failed to parse remote index: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("dataset '{dataset}' has a URL template without {{x}}/{{z}} placeholders: {template}")]
    Template { dataset: String, template: String },
}

#[derive(Debug, Deserialize)]
struct RawIndex {
    datasets: HashMap<String, RawDataset>,
    #[serde(default)]
    climate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawDataset {
    url: String,
    #[serde(default)]
    tiles: Option<Vec<(i32, i32)>>,
}

/// Where one dataset's tiles live.
#[derive(Debug, Clone)]
pub struct DatasetIndex {
    template: String,
    coverage: Option<HashSet<DataTilePos>>,
}

impl DatasetIndex {
    /// Returns true if the remote has a tile at `pos`.
    pub fn covers(&self, pos: &DataTilePos) -> bool {
        self.coverage
            .as_ref()
            .map_or(true, |tiles| tiles.contains(pos))
    }

    /// URL of the tile at `pos`, or `None` if it is outside coverage.
    pub fn url_for(&self, pos: &DataTilePos) -> Option<String> {
        if !self.covers(pos) {
            return None;
        }
        Some(
            self.template
                .replace("{x}", &pos.tile_x.to_string())
                .replace("{z}", &pos.tile_z.to_string()),
        )
    }
}

/// Parsed remote index.
#[derive(Debug, Clone, Default)]
pub struct RemoteIndex {
    datasets: HashMap<String, DatasetIndex>,
    climate: Option<String>,
}

impl RemoteIndex {
    pub fn parse(json: &[u8]) -> Result<Self, IndexError> {
        let raw: RawIndex = serde_json::from_slice(json)?;

        let mut datasets = HashMap::with_capacity(raw.datasets.len());
        for (name, dataset) in raw.datasets {
            if !dataset.url.contains("{x}") || !dataset.url.contains("{z}") {
                return Err(IndexError::Template {
                    dataset: name,
                    template: dataset.url,
                });
            }
            let coverage = dataset
                .tiles
                .map(|tiles| tiles.into_iter().map(|(x, z)| DataTilePos::new(x, z)).collect());
            datasets.insert(
                name,
                DatasetIndex {
                    template: dataset.url,
                    coverage,
                },
            );
        }

        Ok(Self {
            datasets,
            climate: raw.climate,
        })
    }

    /// Fetches and parses the index at `url`.
    ///
    /// Any failure is logged and yields `None`; the session then runs with
    /// every tiled source absent.
    pub async fn fetch<C: TileClient>(client: &C, url: &str) -> Option<Self> {
        let bytes = match client.fetch(url).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                warn!(url = url, "Remote index not found - tiled data unavailable");
                return None;
            }
            Err(e) => {
                warn!(url = url, error = %e, "Failed to fetch remote index - tiled data unavailable");
                return None;
            }
        };

        match Self::parse(&bytes) {
            Ok(index) => {
                info!(url = url, datasets = index.datasets.len(), "Loaded remote index");
                Some(index)
            }
            Err(e) => {
                warn!(url = url, error = %e, "Invalid remote index - tiled data unavailable");
                None
            }
        }
    }

    /// URL of the global climate raster.
    pub fn climate_url(&self) -> Option<&str> {
        self.climate.as_deref()
    }

    pub fn dataset(&self, name: &str) -> Option<&DatasetIndex> {
        self.datasets.get(name)
    }

    /// URL of a dataset's tile, or `None` if the dataset or tile is unknown.
    pub fn url_for(&self, dataset: &str, pos: &DataTilePos) -> Option<String> {
        self.dataset(dataset)?.url_for(pos)
    }
}
