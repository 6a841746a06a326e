//! Disk-backed tile cache with request coalescing.
//!
//! Tiles are stored exactly as downloaded (gzip payloads) under
//! `<root>/<dataset>/<tile_x>/<tile_z>.gz`. A load first checks the disk,
//! then fetches from the remote URL, persisting the bytes atomically before
//! handing them back. Concurrent loads of the same tile share one fetch.
//!
//! Tiles the remote reports as missing are remembered in memory for the rest
//! of the session and never requested again.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashSet;
use tracing::{debug, info, warn};

use super::coalesce::{CoalescerStats, RequestCoalescer};
use super::http::TileClient;
use super::path::{partial_path, tile_path};
use crate::coord::DataTilePos;
use crate::error::DataError;

/// Identifies one tile of one dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TileKey {
    pub dataset: Arc<str>,
    pub pos: DataTilePos,
}

impl TileKey {
    pub fn new(dataset: impl Into<Arc<str>>, pos: DataTilePos) -> Self {
        Self {
            dataset: dataset.into(),
            pos,
        }
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.dataset, self.pos)
    }
}

type LoadResult = Result<Option<Bytes>, DataError>;

/// Snapshot of cache activity.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TileCacheStats {
    /// Remote fetches performed
    pub fetches: u64,
    /// Loads served from disk
    pub disk_hits: u64,
    /// Loads that waited on another caller's in-flight load
    pub coalesced_waits: u64,
    /// Loads answered from the in-memory absent set
    pub absent_hits: u64,
}

#[derive(Debug, Default)]
struct Counters {
    fetches: AtomicU64,
    disk_hits: AtomicU64,
    absent_hits: AtomicU64,
}

struct Shared<C> {
    root: PathBuf,
    client: Arc<C>,
    coalescer: RequestCoalescer<TileKey, LoadResult>,
    absent: DashSet<TileKey>,
    counters: Counters,
}

/// Disk tile cache shared by every tiled source of a session.
///
/// Cloning is cheap; clones share the same coalescer and absent set.
pub struct TileCache<C> {
    shared: Arc<Shared<C>>,
}

impl<C> Clone for TileCache<C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<C: TileClient> TileCache<C> {
    pub fn new(root: impl Into<PathBuf>, client: Arc<C>) -> Self {
        Self {
            shared: Arc::new(Shared {
                root: root.into(),
                client,
                coalescer: RequestCoalescer::new(),
                absent: DashSet::new(),
                counters: Counters::default(),
            }),
        }
    }

    pub fn root(&self) -> &Path {
        &self.shared.root
    }

    pub fn client(&self) -> &Arc<C> {
        &self.shared.client
    }

    /// Loads the raw payload for `key`.
    ///
    /// `url` is where the tile lives remotely; `None` means the remote has no
    /// such tile and the load is absent. The returned future completes even
    /// if the caller stops awaiting it, because the work runs in a spawned
    /// task.
    pub async fn load(&self, key: TileKey, url: Option<String>) -> LoadResult {
        let shared = &self.shared;

        if shared.absent.contains(&key) {
            shared.counters.absent_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        }

        let registration = shared.coalescer.register(key.clone());
        let is_leader = registration.is_new_request();
        let mut receiver = registration.into_receiver();

        if is_leader {
            let cache = self.clone();
            let key = key.clone();
            tokio::spawn(async move {
                let load = {
                    let cache = cache.clone();
                    let key = key.clone();
                    tokio::spawn(async move { cache.load_uncoalesced(&key, url).await })
                };
                // A panicking load must still release the waiters.
                let result = load.await.unwrap_or_else(|e| {
                    warn!(tile = %key, error = %e, "Tile load task failed");
                    Err(DataError::Task(format!("tile load for {} failed: {}", key, e)))
                });
                cache.shared.coalescer.complete(&key, result);
            });
        }

        receiver
            .recv()
            .await
            .map_err(|e| DataError::Task(format!("tile load for {} abandoned: {}", key, e)))?
    }

    async fn load_uncoalesced(&self, key: &TileKey, url: Option<String>) -> LoadResult {
        let path = tile_path(&self.shared.root, &key.dataset, &key.pos);

        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                self.shared.counters.disk_hits.fetch_add(1, Ordering::Relaxed);
                debug!(tile = %key, "Tile cache hit");
                return Ok(Some(Bytes::from(bytes)));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(tile = %key, path = %path.display(), error = %e, "Failed to read cached tile");
                return Err(e.into());
            }
        }

        let Some(url) = url else {
            debug!(tile = %key, "No remote URL for tile");
            self.shared.absent.insert(key.clone());
            return Ok(None);
        };

        self.shared.counters.fetches.fetch_add(1, Ordering::Relaxed);
        debug!(tile = %key, url = %url, "Fetching tile");

        match self.shared.client.fetch(&url).await? {
            Some(bytes) => {
                write_atomic(&path, &bytes).await?;
                Ok(Some(bytes))
            }
            None => {
                debug!(tile = %key, "Remote has no such tile");
                self.shared.absent.insert(key.clone());
                Ok(None)
            }
        }
    }

    /// Returns true if `key` is known to be missing this session.
    pub fn is_known_absent(&self, key: &TileKey) -> bool {
        self.shared.absent.contains(key)
    }

    pub fn stats(&self) -> TileCacheStats {
        let counters = &self.shared.counters;
        TileCacheStats {
            fetches: counters.fetches.load(Ordering::Relaxed),
            disk_hits: counters.disk_hits.load(Ordering::Relaxed),
            coalesced_waits: self.shared.coalescer.stats().coalesced_requests,
            absent_hits: counters.absent_hits.load(Ordering::Relaxed),
        }
    }

    pub fn coalescer_stats(&self) -> CoalescerStats {
        self.shared.coalescer.stats()
    }

    /// Logs current statistics.
    pub fn log_stats(&self) {
        let stats = self.stats();
        info!(
            fetches = stats.fetches,
            disk_hits = stats.disk_hits,
            coalesced = stats.coalesced_waits,
            absent_hits = stats.absent_hits,
            known_absent = self.shared.absent.len(),
            "Tile cache statistics"
        );
    }
}

/// Writes `bytes` to `path` through a temporary sibling and a rename, so an
/// interrupted write never leaves a truncated tile in place.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), DataError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let partial = partial_path(path);
    tokio::fs::write(&partial, bytes).await?;
    if let Err(e) = tokio::fs::rename(&partial, path).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::http::mock::MockClient;
    use std::time::Duration;
    use tempfile::TempDir;

    const URL: &str = "https://tiles.example/landcover/1/2";

    fn key() -> TileKey {
        TileKey::new("landcover", DataTilePos::new(1, 2))
    }

    struct PanickingClient;

    impl TileClient for PanickingClient {
        async fn fetch(&self, url: &str) -> Result<Option<Bytes>, DataError> {
            panic!("client bug while fetching {}", url)
        }
    }

    #[tokio::test]
    async fn test_panicking_fetch_releases_waiters() {
        let temp = TempDir::new().unwrap();
        let cache = TileCache::new(temp.path(), Arc::new(PanickingClient));

        let (first, second) = tokio::time::timeout(Duration::from_secs(5), async {
            futures::join!(
                cache.load(key(), Some(URL.into())),
                cache.load(key(), Some(URL.into()))
            )
        })
        .await
        .expect("waiters released");
        assert!(matches!(first, Err(DataError::Task(_))));
        assert!(matches!(second, Err(DataError::Task(_))));
        assert_eq!(cache.shared.coalescer.in_flight_count(), 0);

        let retry = tokio::time::timeout(Duration::from_secs(5), cache.load(key(), Some(URL.into())))
            .await
            .expect("later load not stuck");
        assert!(matches!(retry, Err(DataError::Task(_))));
        assert!(!cache.is_known_absent(&key()));
    }

    #[tokio::test]
    async fn test_fetch_persists_to_disk() {
        let temp = TempDir::new().unwrap();
        let client = MockClient::new();
        client.respond(URL, Ok(Some(Bytes::from_static(b"payload"))));
        let cache = TileCache::new(temp.path(), Arc::new(client.clone()));

        let bytes = cache.load(key(), Some(URL.into())).await.unwrap();
        assert_eq!(bytes.as_deref(), Some(&b"payload"[..]));

        let on_disk = std::fs::read(temp.path().join("landcover/1/2.gz")).unwrap();
        assert_eq!(on_disk, b"payload");
        assert!(!temp.path().join("landcover/1/2.gz.partial").exists());
    }

    #[tokio::test]
    async fn test_second_load_hits_disk() {
        let temp = TempDir::new().unwrap();
        let client = MockClient::new();
        client.respond(URL, Ok(Some(Bytes::from_static(b"x"))));
        let cache = TileCache::new(temp.path(), Arc::new(client.clone()));

        cache.load(key(), Some(URL.into())).await.unwrap();
        cache.load(key(), Some(URL.into())).await.unwrap();

        assert_eq!(client.requests_for(URL), 1);
        let stats = cache.stats();
        assert_eq!(stats.fetches, 1);
        assert_eq!(stats.disk_hits, 1);
    }

    #[tokio::test]
    async fn test_concurrent_loads_fetch_once() {
        let temp = TempDir::new().unwrap();
        let client = MockClient::with_delay(Duration::from_millis(50));
        client.respond(URL, Ok(Some(Bytes::from_static(b"shared"))));
        let cache = TileCache::new(temp.path(), Arc::new(client.clone()));

        let (a, b) = tokio::join!(
            cache.load(key(), Some(URL.into())),
            cache.load(key(), Some(URL.into()))
        );

        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(client.total_requests(), 1);
        assert_eq!(cache.stats().coalesced_waits, 1);
    }

    #[tokio::test]
    async fn test_not_found_is_remembered() {
        let temp = TempDir::new().unwrap();
        let client = MockClient::new();
        let cache = TileCache::new(temp.path(), Arc::new(client.clone()));

        assert_eq!(cache.load(key(), Some(URL.into())).await, Ok(None));
        assert_eq!(cache.load(key(), Some(URL.into())).await, Ok(None));

        assert_eq!(client.requests_for(URL), 1);
        assert!(cache.is_known_absent(&key()));
        assert_eq!(cache.stats().absent_hits, 1);
        assert!(!temp.path().join("landcover/1/2.gz").exists());
    }

    #[tokio::test]
    async fn test_missing_url_is_absent_without_fetch() {
        let temp = TempDir::new().unwrap();
        let client = MockClient::new();
        let cache = TileCache::new(temp.path(), Arc::new(client.clone()));

        assert_eq!(cache.load(key(), None).await, Ok(None));
        assert_eq!(client.total_requests(), 0);
    }

    #[tokio::test]
    async fn test_network_error_is_not_cached() {
        let temp = TempDir::new().unwrap();
        let client = MockClient::new();
        client.respond(URL, Err(DataError::Network("HTTP 503".into())));
        let cache = TileCache::new(temp.path(), Arc::new(client.clone()));

        let first = cache.load(key(), Some(URL.into())).await;
        assert!(matches!(first, Err(DataError::Network(_))));
        assert!(!cache.is_known_absent(&key()));

        // No retry inside the cache, but a later call tries again
        client.respond(URL, Ok(Some(Bytes::from_static(b"ok"))));
        let second = cache.load(key(), Some(URL.into())).await.unwrap();
        assert_eq!(second.as_deref(), Some(&b"ok"[..]));
        assert_eq!(client.requests_for(URL), 2);
    }

    #[tokio::test]
    async fn test_abandoned_load_still_completes() {
        let temp = TempDir::new().unwrap();
        let client = MockClient::with_delay(Duration::from_millis(30));
        client.respond(URL, Ok(Some(Bytes::from_static(b"late"))));
        let cache = TileCache::new(temp.path(), Arc::new(client.clone()));

        let load = cache.load(key(), Some(URL.into()));
        let _ = tokio::time::timeout(Duration::from_millis(1), load).await;

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(temp.path().join("landcover/1/2.gz").exists());
    }
}
