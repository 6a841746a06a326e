//! Per-column data bundles.
//!
//! A [`ColumnData`] holds every derived raster for one 16×16 chunk column.
//! The [`ColumnDataGenerator`] knows which [`DataOp`](crate::dataop::DataOp)
//! produces each key, and the [`ColumnDataCache`] makes sure each column is
//! computed at most once while anyone holds a [`ColumnLease`] on it.
//!
//! # Example
//!
//! ```ignore
//! let cache = ColumnDataCache::new(generator, ColumnCacheConfig::default(), Handle::current());
//!
//! let lease = cache.acquire(ColumnPos::new(0, 0));
//! let data = lease.future().await?;
//! if let Some(elevation) = data.get::<keys::Elevation>() {
//!     // ...
//! }
//! // lease released on drop
//! ```

mod cache;
mod data;
mod generator;
pub mod keys;

pub use cache::{
    run_eviction_daemon, ColumnCacheConfig, ColumnCacheStats, ColumnDataCache, ColumnFuture,
    ColumnLease, ColumnResult, EvictionResult, DEFAULT_COLUMN_CAPACITY, DEFAULT_COLUMN_TTL,
};
pub use data::{ColumnData, Slot};
pub use generator::ColumnDataGenerator;
pub use keys::DataKey;
