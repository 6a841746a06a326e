//! Reference-counted cache of column computations.
//!
//! # Design
//!
//! Each column position maps to one [`Entry`] holding a shared future of the
//! column's bundle. The computation is spawned on the runtime when the entry
//! is created, so it runs to completion even if every holder goes away.
//!
//! Callers hold a [`ColumnLease`] while they use an entry. The lease counts
//! as a reference and releases it on drop. Entries with no references whose
//! computation has finished become eligible for eviction once their TTL
//! since the last release runs out, or when the cache is over capacity
//! (oldest release first).
//!
//! Lookup-and-increment and eviction both run under the map's shard lock
//! for the position, so an entry is never removed between a caller finding
//! it and taking its reference.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use super::data::ColumnData;
use super::generator::ColumnDataGenerator;
use crate::coord::ColumnPos;
use crate::error::DataError;

/// Default number of columns kept once released.
pub const DEFAULT_COLUMN_CAPACITY: usize = 256;

/// Default time a released column stays cached.
pub const DEFAULT_COLUMN_TTL: Duration = Duration::from_secs(30);

/// Result type of a column computation.
pub type ColumnResult = Result<Arc<ColumnData>, DataError>;

/// Future shared by every lease on one entry.
pub type ColumnFuture = Shared<BoxFuture<'static, ColumnResult>>;

/// Sizing for [`ColumnDataCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnCacheConfig {
    /// Entries kept before the oldest released ones are evicted
    pub capacity: usize,
    /// How long an entry survives after its last release
    pub ttl: Duration,
}

impl Default for ColumnCacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_COLUMN_CAPACITY,
            ttl: DEFAULT_COLUMN_TTL,
        }
    }
}

/// Counters for [`ColumnDataCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnCacheStats {
    /// Column computations spawned
    pub computations: u64,
    /// Acquires served by an existing entry
    pub reuse_hits: u64,
    /// Entries removed by eviction
    pub evictions: u64,
    /// Entries currently held
    pub live_entries: usize,
}

/// Outcome of one eviction pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvictionResult {
    pub expired: usize,
    pub over_capacity: usize,
    pub remaining: usize,
}

impl EvictionResult {
    pub fn evicted(&self) -> usize {
        self.expired + self.over_capacity
    }
}

struct Entry {
    future: ColumnFuture,
    refs: AtomicUsize,
    /// Milliseconds since the cache epoch at the last release
    released_at: AtomicU64,
    done: Arc<AtomicBool>,
}

impl Entry {
    fn is_idle(&self) -> bool {
        self.refs.load(Ordering::Acquire) == 0 && self.done.load(Ordering::Acquire)
    }
}

struct MarkDone(Arc<AtomicBool>);

impl Drop for MarkDone {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}

struct Inner {
    entries: DashMap<ColumnPos, Arc<Entry>>,
    generator: ColumnDataGenerator,
    config: ColumnCacheConfig,
    runtime: Handle,
    epoch: Instant,
    computations: AtomicU64,
    reuse_hits: AtomicU64,
    evictions: AtomicU64,
}

impl Inner {
    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    fn spawn(&self, pos: ColumnPos) -> Entry {
        let done = Arc::new(AtomicBool::new(false));
        let finished = Arc::clone(&done);
        let computation = self.generator.generate(pos);

        let handle = self.runtime.spawn(async move {
            // Marks the entry finished on return and on panic unwind.
            let _finished = MarkDone(finished);
            computation.await.map(Arc::new)
        });

        let future = async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => Err(DataError::from(e)),
            }
        }
        .boxed()
        .shared();

        Entry {
            future,
            refs: AtomicUsize::new(1),
            released_at: AtomicU64::new(0),
            done,
        }
    }
}

/// Single entry point for column bundles.
///
/// At most one computation per position is in flight; later acquires share
/// it. Clones share the same cache.
#[derive(Clone)]
pub struct ColumnDataCache {
    inner: Arc<Inner>,
}

impl ColumnDataCache {
    /// Creates a cache that spawns column computations on `runtime`.
    pub fn new(generator: ColumnDataGenerator, config: ColumnCacheConfig, runtime: Handle) -> Self {
        info!(
            keys = generator.len(),
            capacity = config.capacity,
            ttl_secs = config.ttl.as_secs(),
            "Column data cache created"
        );

        Self {
            inner: Arc::new(Inner {
                entries: DashMap::new(),
                generator,
                config,
                runtime,
                epoch: Instant::now(),
                computations: AtomicU64::new(0),
                reuse_hits: AtomicU64::new(0),
                evictions: AtomicU64::new(0),
            }),
        }
    }

    pub fn config(&self) -> ColumnCacheConfig {
        self.inner.config
    }

    /// Takes a reference to the entry for `pos`, creating it and spawning
    /// its computation if needed.
    ///
    /// Never blocks on the computation; await [`ColumnLease::future`] for it.
    pub fn acquire(&self, pos: ColumnPos) -> ColumnLease {
        self.evict_expired();

        let entry = match self.inner.entries.entry(pos) {
            dashmap::mapref::entry::Entry::Occupied(occupied) => {
                let entry = Arc::clone(occupied.get());
                entry.refs.fetch_add(1, Ordering::AcqRel);
                self.inner.reuse_hits.fetch_add(1, Ordering::Relaxed);
                trace!(column = %pos, "Column entry reused");
                entry
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                let entry = Arc::new(self.inner.spawn(pos));
                self.inner.computations.fetch_add(1, Ordering::Relaxed);
                debug!(column = %pos, "Column computation started");
                vacant.insert(Arc::clone(&entry));
                entry
            }
        };

        ColumnLease {
            pos,
            entry,
            inner: Arc::clone(&self.inner),
        }
    }

    /// Acquires, awaits and releases in one call.
    pub async fn get(&self, pos: ColumnPos) -> ColumnResult {
        let lease = self.acquire(pos);
        lease.future().await
    }

    /// Current reference count for `pos`, or `None` if it is not cached.
    pub fn ref_count(&self, pos: ColumnPos) -> Option<usize> {
        self.inner
            .entries
            .get(&pos)
            .map(|entry| entry.refs.load(Ordering::Acquire))
    }

    pub fn contains(&self, pos: ColumnPos) -> bool {
        self.inner.entries.contains_key(&pos)
    }

    /// Removes idle entries past their TTL, then the oldest idle entries
    /// while the cache is over capacity.
    pub fn evict_expired(&self) -> EvictionResult {
        let inner = &self.inner;
        let now = inner.now_ms();
        let ttl = inner.config.ttl.as_millis() as u64;

        let mut idle: Vec<(ColumnPos, u64)> = inner
            .entries
            .iter()
            .filter(|entry| entry.value().is_idle())
            .map(|entry| (*entry.key(), entry.value().released_at.load(Ordering::Acquire)))
            .collect();

        let mut result = EvictionResult::default();
        if idle.is_empty() {
            result.remaining = inner.entries.len();
            return result;
        }

        idle.sort_by_key(|&(_, released_at)| released_at);

        let mut survivors = Vec::with_capacity(idle.len());
        for (pos, released_at) in idle {
            if now.saturating_sub(released_at) >= ttl && self.remove_if_idle(pos) {
                result.expired += 1;
            } else {
                survivors.push(pos);
            }
        }

        for pos in survivors {
            if inner.entries.len() <= inner.config.capacity {
                break;
            }
            if self.remove_if_idle(pos) {
                result.over_capacity += 1;
            }
        }

        result.remaining = inner.entries.len();
        if result.evicted() > 0 {
            inner
                .evictions
                .fetch_add(result.evicted() as u64, Ordering::Relaxed);
            debug!(
                expired = result.expired,
                over_capacity = result.over_capacity,
                remaining = result.remaining,
                "Evicted column entries"
            );
        }
        result
    }

    fn remove_if_idle(&self, pos: ColumnPos) -> bool {
        self.inner
            .entries
            .remove_if(&pos, |_, entry| entry.is_idle())
            .is_some()
    }

    /// Spawns a task running [`evict_expired`](Self::evict_expired) every
    /// `interval` until `cancellation` fires.
    pub fn start_eviction_daemon(
        &self,
        interval: Duration,
        cancellation: CancellationToken,
    ) -> JoinHandle<()> {
        let cache = self.clone();
        self.inner
            .runtime
            .spawn(run_eviction_daemon(cache, interval, cancellation))
    }

    pub fn stats(&self) -> ColumnCacheStats {
        ColumnCacheStats {
            computations: self.inner.computations.load(Ordering::Relaxed),
            reuse_hits: self.inner.reuse_hits.load(Ordering::Relaxed),
            evictions: self.inner.evictions.load(Ordering::Relaxed),
            live_entries: self.inner.entries.len(),
        }
    }
}

impl std::fmt::Debug for ColumnDataCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnDataCache")
            .field("config", &self.inner.config)
            .field("stats", &self.stats())
            .finish()
    }
}

/// Periodically evicts idle column entries.
pub async fn run_eviction_daemon(
    cache: ColumnDataCache,
    interval: Duration,
    cancellation: CancellationToken,
) {
    info!(
        interval_ms = interval.as_millis() as u64,
        "Starting column eviction daemon"
    );

    loop {
        tokio::select! {
            _ = cancellation.cancelled() => {
                info!("Column eviction daemon shutting down");
                break;
            }
            _ = tokio::time::sleep(interval) => {
                cache.evict_expired();
            }
        }
    }
}

/// A held reference to a cached column.
///
/// Dropping the lease releases the reference.
pub struct ColumnLease {
    pos: ColumnPos,
    entry: Arc<Entry>,
    inner: Arc<Inner>,
}

impl ColumnLease {
    pub fn pos(&self) -> ColumnPos {
        self.pos
    }

    /// The entry's shared future. Every call returns a handle to the same
    /// computation.
    pub fn future(&self) -> ColumnFuture {
        self.entry.future.clone()
    }

    /// The result if the computation has already been observed to finish.
    pub fn peek(&self) -> Option<&ColumnResult> {
        self.entry.future.peek()
    }

    /// Releases the reference now instead of at end of scope.
    pub fn release(self) {}
}

impl Drop for ColumnLease {
    fn drop(&mut self) {
        self.entry
            .released_at
            .store(self.inner.now_ms(), Ordering::Release);
        let previous = self.entry.refs.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "column lease released more than once");
        trace!(column = %self.pos, refs = previous - 1, "Column lease released");
    }
}

impl std::fmt::Debug for ColumnLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnLease")
            .field("pos", &self.pos)
            .field("refs", &self.entry.refs.load(Ordering::Relaxed))
            .finish()
    }
}
