//! Session-wide earth datasets.

use std::sync::Arc;

use tracing::{info, warn};

use crate::dataop::WorkerPool;
use crate::source::{RemoteIndex, TileCache, TileClient, WorldClimateRaster};
use crate::world::WorldScale;

/// Shared reference data for one session.
///
/// Built once at session start and handed to the graph builder. Dropping
/// the context (and the ops built from it) releases everything it holds.
pub struct EarthContext<C> {
    world: WorldScale,
    cache: TileCache<C>,
    pool: WorkerPool,
    index: Option<Arc<RemoteIndex>>,
    climate: Option<Arc<WorldClimateRaster>>,
}

impl<C: TileClient> EarthContext<C> {
    /// A context with no remote index and no climate data.
    pub fn new(world: WorldScale, cache: TileCache<C>, pool: WorkerPool) -> Self {
        Self {
            world,
            cache,
            pool,
            index: None,
            climate: None,
        }
    }

    /// Fetches the remote index at `index_url` and the climate raster it
    /// names.
    ///
    /// Neither failure is fatal: without an index every tiled source is
    /// absent, and without climate data the climate keys are absent.
    pub async fn load(
        world: WorldScale,
        cache: TileCache<C>,
        pool: WorkerPool,
        index_url: Option<&str>,
    ) -> Self {
        let index = match index_url {
            Some(url) => RemoteIndex::fetch(cache.client().as_ref(), url).await,
            None => {
                warn!("No remote index configured - tiled data unavailable");
                None
            }
        };

        let climate = WorldClimateRaster::load(&cache, index.as_ref(), &pool).await;

        info!(
            world = %world,
            index = index.is_some(),
            climate = climate.is_some(),
            "Earth context ready"
        );

        Self {
            world,
            cache,
            pool,
            index: index.map(Arc::new),
            climate,
        }
    }

    pub fn with_index(mut self, index: RemoteIndex) -> Self {
        self.index = Some(Arc::new(index));
        self
    }

    pub fn with_climate(mut self, climate: WorldClimateRaster) -> Self {
        self.climate = Some(Arc::new(climate));
        self
    }

    pub fn world(&self) -> &WorldScale {
        &self.world
    }

    pub fn cache(&self) -> &TileCache<C> {
        &self.cache
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn index(&self) -> Option<&Arc<RemoteIndex>> {
        self.index.as_ref()
    }

    pub fn climate(&self) -> Option<&Arc<WorldClimateRaster>> {
        self.climate.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::codec::compress;
    use crate::source::http::mock::MockClient;
    use bytes::Bytes;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_without_index() {
        let temp = TempDir::new().unwrap();
        let client = MockClient::new();
        let cache = TileCache::new(temp.path(), Arc::new(client.clone()));

        let ctx = EarthContext::load(WorldScale::default(), cache, WorkerPool::new(1, "test"), None).await;

        assert!(ctx.index().is_none());
        assert!(ctx.climate().is_none());
        assert_eq!(client.total_requests(), 0);
    }

    #[tokio::test]
    async fn test_load_fetches_index_then_climate() {
        let temp = TempDir::new().unwrap();
        let client = MockClient::new();
        client.respond(
            "mock://index.json",
            Ok(Some(Bytes::from_static(
                br#"{ "datasets": {}, "climate": "mock://climate.gz" }"#,
            ))),
        );
        client.respond("mock://climate.gz", Ok(Some(Bytes::from(compress(&[0u8; 10]).unwrap()))));

        let cache = TileCache::new(temp.path(), Arc::new(client.clone()));
        let ctx = EarthContext::load(
            WorldScale::default(),
            cache,
            WorkerPool::new(1, "test"),
            Some("mock://index.json"),
        )
        .await;

        assert!(ctx.index().is_some());
        // Full-size climate tables are required; the short payload is dropped
        assert!(ctx.climate().is_none());
        assert_eq!(client.requests_for("mock://climate.gz"), 1);
    }
}
