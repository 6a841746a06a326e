//! End-to-end column generation against an in-memory remote.
//!
//! Serves a remote index and land cover tiles around the world origin, then
//! computes columns through the earth generator and the column cache.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use tempfile::TempDir;
use tokio::runtime::Handle;

use terragrid::column::{keys, ColumnCacheConfig, ColumnDataCache};
use terragrid::coord::ColumnPos;
use terragrid::dataop::{MemoConfig, WorkerPool};
use terragrid::earth::{earth_generator, Cover, EarthContext, Landform};
use terragrid::error::DataError;
use terragrid::raster::Raster;
use terragrid::source::codec::encode_u8_tile;
use terragrid::source::{TileCache, TileClient};
use terragrid::world::WorldScale;

const INDEX_URL: &str = "https://data.test/index.json";
const LANDCOVER_TILE: usize = 1800;

#[derive(Clone, Default)]
struct RemoteFixture {
    responses: Arc<Mutex<HashMap<String, Bytes>>>,
    requests: Arc<Mutex<HashMap<String, usize>>>,
    total: Arc<AtomicUsize>,
}

impl RemoteFixture {
    fn serve(&self, url: &str, body: impl Into<Bytes>) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), body.into());
    }

    fn requests_for(&self, url: &str) -> usize {
        self.requests.lock().unwrap().get(url).copied().unwrap_or(0)
    }
}

impl TileClient for RemoteFixture {
    async fn fetch(&self, url: &str) -> Result<Option<Bytes>, DataError> {
        self.total.fetch_add(1, Ordering::SeqCst);
        *self
            .requests
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default() += 1;
        Ok(self.responses.lock().unwrap().get(url).cloned())
    }
}

fn landcover_url(x: i32, z: i32) -> String {
    format!("https://data.test/landcover/{}/{}.gz", x, z)
}

/// A remote whose land cover around the origin is uniformly `cover`.
/// Elevation is listed in the index but has no tiles.
fn remote_with_cover(cover: Cover) -> RemoteFixture {
    let remote = RemoteFixture::default();
    remote.serve(
        INDEX_URL,
        r#"{
            "datasets": {
                "landcover": { "url": "https://data.test/landcover/{x}/{z}.gz" },
                "elevation": { "url": "https://data.test/elevation/{x}/{z}.gz" }
            }
        }"#,
    );

    let tile = Raster::filled(LANDCOVER_TILE, LANDCOVER_TILE, cover.id());
    let payload = encode_u8_tile(&tile).unwrap();
    for x in [35, 36] {
        for z in [17, 18] {
            remote.serve(&landcover_url(x, z), payload.clone());
        }
    }
    remote
}

async fn context(remote: &RemoteFixture, dir: &TempDir) -> EarthContext<RemoteFixture> {
    let world = WorldScale::new(1.0).unwrap();
    let cache = TileCache::new(dir.path(), Arc::new(remote.clone()));
    EarthContext::load(world, cache, WorkerPool::new(2, "test"), Some(INDEX_URL)).await
}

#[tokio::test]
async fn test_origin_column_from_cover_only() {
    let dir = TempDir::new().unwrap();
    let remote = remote_with_cover(Cover::Urban);
    let ctx = context(&remote, &dir).await;
    assert!(ctx.index().is_some());
    assert!(ctx.climate().is_none());

    let generator = earth_generator(&ctx, MemoConfig::default());
    let data = generator.generate(ColumnPos::new(0, 0)).await.unwrap();

    assert!(data.get::<keys::Elevation>().is_none());
    assert!(data.get::<keys::Water>().is_none());
    assert!(data.get::<keys::MeanTemperature>().is_none());

    let cover = data.get::<keys::Cover>().expect("cover present");
    assert_eq!(cover.width(), 16);
    assert_eq!(cover.height(), 16);
    assert!(cover.data().iter().all(|&c| c == Cover::Urban));

    let landform = data.get::<keys::Landform>().expect("landform present");
    assert!(landform.data().iter().all(|&l| l == Landform::Land));
}

#[tokio::test]
async fn test_water_cover_at_sea_level_is_sea() {
    let dir = TempDir::new().unwrap();
    let remote = remote_with_cover(Cover::Water);
    let ctx = context(&remote, &dir).await;

    let data = earth_generator(&ctx, MemoConfig::default())
        .generate(ColumnPos::new(0, 0))
        .await
        .unwrap();

    let landform = data.get::<keys::Landform>().expect("landform present");
    assert!(landform.data().iter().all(|&l| l == Landform::Sea));
}

#[tokio::test]
async fn test_neighbouring_columns_share_tile_downloads() {
    let dir = TempDir::new().unwrap();
    let remote = remote_with_cover(Cover::Grassland);
    let ctx = context(&remote, &dir).await;

    let columns = ColumnDataCache::new(
        earth_generator(&ctx, MemoConfig::default()),
        ColumnCacheConfig {
            capacity: 16,
            ttl: Duration::from_secs(60),
        },
        Handle::current(),
    );

    let leases: Vec<_> = [(0, 0), (1, 0), (0, 1), (-1, -1)]
        .into_iter()
        .map(|(x, z)| columns.acquire(ColumnPos::new(x, z)))
        .collect();
    for lease in &leases {
        let data = lease.future().await.unwrap();
        assert!(data.get::<keys::Cover>().is_some());
    }

    for x in [35, 36] {
        for z in [17, 18] {
            assert!(remote.requests_for(&landcover_url(x, z)) <= 1);
        }
    }
    assert_eq!(remote.requests_for(INDEX_URL), 1);

    drop(leases);
    assert_eq!(columns.stats().computations, 4);
}
