//! The `DataOp` node and its combinators.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{self, BoxFuture, FutureExt};
use moka::future::Cache;
use tracing::trace;

use super::pool::WorkerPool;
use crate::coord::DataView;
use crate::error::{DataError, DataResult};

/// Default number of views a memoized node keeps.
pub const DEFAULT_MEMO_CAPACITY: u64 = 4;

/// Default idle time after which a memoized view is dropped.
pub const DEFAULT_MEMO_TTL: Duration = Duration::from_secs(5);

/// Future returned by [`DataOp::apply`].
pub type OpFuture<T> = BoxFuture<'static, DataResult<T>>;

type OpFunction<T> = dyn Fn(DataView) -> OpFuture<T> + Send + Sync;
type CopyFunction<T> = dyn Fn(&T) -> T + Send + Sync;

/// Sizing of a memoization cache attached with [`DataOp::cached_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoConfig {
    /// Maximum number of distinct views retained
    pub capacity: u64,
    /// Entries are dropped after this long without being read
    pub time_to_idle: Duration,
}

impl Default for MemoConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_MEMO_CAPACITY,
            time_to_idle: DEFAULT_MEMO_TTL,
        }
    }
}

struct Memo<T> {
    cache: Cache<DataView, Option<Arc<T>>>,
    copy: Arc<CopyFunction<T>>,
}

struct OpInner<T> {
    function: Box<OpFunction<T>>,
    memo: Option<Memo<T>>,
}

/// A lazily evaluated, asynchronous transform over a [`DataView`].
///
/// Nodes are cheap to clone and clones share the same function and memo
/// cache, so a single node can be referenced from several branches of a
/// graph. Evaluating a node returns a future resolving to:
///
/// - `Ok(Some(value))` when data is available,
/// - `Ok(None)` when the data is legitimately absent,
/// - `Err(_)` when loading or decoding failed.
///
/// Combinators never invoke their transform on absent or failed upstream
/// results.
pub struct DataOp<T> {
    inner: Arc<OpInner<T>>,
}

impl<T> Clone for DataOp<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> std::fmt::Debug for DataOp<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataOp")
            .field("cached", &self.inner.memo.is_some())
            .finish()
    }
}

impl<T: Send + Sync + 'static> DataOp<T> {
    /// Wraps an asynchronous function of the requested view.
    pub fn of<F, Fut>(function: F) -> Self
    where
        F: Fn(DataView) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DataResult<T>> + Send + 'static,
    {
        Self::from_inner(OpInner {
            function: Box::new(move |view| function(view).boxed()),
            memo: None,
        })
    }

    /// Wraps a cheap synchronous function that always produces a value.
    pub fn of_sync<F>(function: F) -> Self
    where
        F: Fn(&DataView) -> T + Send + Sync + 'static,
    {
        Self::of(move |view| future::ready(Ok(Some(function(&view)))))
    }

    /// A node that yields `value` for every view.
    pub fn completed(value: Option<T>) -> Self
    where
        T: Clone,
    {
        Self::of(move |_| future::ready(Ok(value.clone())))
    }

    /// A node that is absent for every view.
    pub fn absent() -> Self {
        Self::of(|_| future::ready(Ok(None)))
    }

    fn from_inner(inner: OpInner<T>) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Returns true if a memoization cache is attached.
    pub fn is_cached(&self) -> bool {
        self.inner.memo.is_some()
    }

    /// Evaluates this node for `view`.
    ///
    /// For memoized nodes, concurrent calls with the same view share one
    /// evaluation and each receives its own copy of the result.
    pub fn apply(&self, view: DataView) -> OpFuture<T> {
        let Some(memo) = &self.inner.memo else {
            return (self.inner.function)(view);
        };

        let inner = Arc::clone(&self.inner);
        let cache = memo.cache.clone();
        let copy = Arc::clone(&memo.copy);

        async move {
            let shared = cache
                .try_get_with(view, async {
                    trace!(view = %view, "Memoized op miss - evaluating");
                    (inner.function)(view)
                        .await
                        .map(|result| result.map(Arc::new))
                })
                .await
                .map_err(|e: Arc<DataError>| (*e).clone())?;

            Ok::<_, DataError>(shared.map(|value| copy(&value)))
        }
        .boxed()
    }

    /// Attaches a memoization cache with default sizing (4 views, 5 second
    /// idle expiry).
    ///
    /// `copy` is applied to every result handed out so callers never share a
    /// mutable buffer. Failures are not memoized.
    pub fn cached<C>(self, copy: C) -> Self
    where
        C: Fn(&T) -> T + Send + Sync + 'static,
    {
        self.cached_with(MemoConfig::default(), copy)
    }

    /// Attaches a memoization cache with explicit sizing.
    pub fn cached_with<C>(self, config: MemoConfig, copy: C) -> Self
    where
        C: Fn(&T) -> T + Send + Sync + 'static,
    {
        let cache = Cache::builder()
            .max_capacity(config.capacity)
            .time_to_idle(config.time_to_idle)
            .build();

        let memo = Memo {
            cache,
            copy: Arc::new(copy),
        };

        let source = self;
        Self::from_inner(OpInner {
            function: Box::new(move |view| source.apply(view)),
            memo: Some(memo),
        })
    }

    /// Transforms present results.
    pub fn map<U, F>(&self, map: F) -> DataOp<U>
    where
        U: Send + Sync + 'static,
        F: Fn(T, &DataView) -> U + Send + Sync + 'static,
    {
        let source = self.clone();
        let map = Arc::new(map);
        DataOp::of(move |view| {
            let map = Arc::clone(&map);
            source
                .apply(view)
                .map(move |result| result.map(|opt| opt.map(|value| map(value, &view))))
        })
    }

    /// Transforms present results into possibly-absent ones.
    pub fn flat_map<U, F>(&self, map: F) -> DataOp<U>
    where
        U: Send + Sync + 'static,
        F: Fn(T, &DataView) -> Option<U> + Send + Sync + 'static,
    {
        let source = self.clone();
        let map = Arc::new(map);
        DataOp::of(move |view| {
            let map = Arc::clone(&map);
            source
                .apply(view)
                .map(move |result| result.map(|opt| opt.and_then(|value| map(value, &view))))
        })
    }

    /// Transforms present results with a fallible function.
    pub fn try_map<U, F>(&self, map: F) -> DataOp<U>
    where
        U: Send + Sync + 'static,
        F: Fn(T, &DataView) -> DataResult<U> + Send + Sync + 'static,
    {
        let source = self.clone();
        let map = Arc::new(map);
        DataOp::of(move |view| {
            let map = Arc::clone(&map);
            source.apply(view).map(move |result| match result? {
                Some(value) => map(value, &view),
                None => Ok(None),
            })
        })
    }

    /// Transforms present results on `pool` instead of the calling task.
    ///
    /// Use this for CPU-heavy transforms (rasterization, large resamples).
    pub fn map_blocking<U, F>(&self, pool: &WorkerPool, map: F) -> DataOp<U>
    where
        U: Send + Sync + 'static,
        F: Fn(T, &DataView) -> U + Send + Sync + 'static,
    {
        let source = self.clone();
        let pool = pool.clone();
        let map = Arc::new(map);
        DataOp::of(move |view| {
            let source = source.clone();
            let pool = pool.clone();
            let map = Arc::clone(&map);
            async move {
                match source.apply(view).await? {
                    Some(value) => pool.run(move || map(value, &view)).await.map(Some),
                    None => Ok(None),
                }
            }
        })
    }

    /// Replaces failures with whatever `on_error` returns for them.
    ///
    /// Present and absent results pass through unchanged.
    pub fn recover<F>(&self, on_error: F) -> DataOp<T>
    where
        F: Fn(&DataError, &DataView) -> DataResult<T> + Send + Sync + 'static,
    {
        let source = self.clone();
        let on_error = Arc::new(on_error);
        DataOp::of(move |view| {
            let on_error = Arc::clone(&on_error);
            source.apply(view).map(move |result| match result {
                Err(e) => on_error(&e, &view),
                ok => ok,
            })
        })
    }
}

/// Evaluates both nodes concurrently and pairs their results.
///
/// Absent if either side is absent; fails if either side fails. Both
/// evaluations always start, even when one of them resolves first.
pub fn join2<A, B>(a: &DataOp<A>, b: &DataOp<B>) -> DataOp<(A, B)>
where
    A: Send + Sync + 'static,
    B: Send + Sync + 'static,
{
    let (a, b) = (a.clone(), b.clone());
    DataOp::of(move |view| {
        let both = future::join(a.apply(view), b.apply(view));
        both.map(|(a, b)| -> DataResult<(A, B)> {
            match (a?, b?) {
                (Some(a), Some(b)) => Ok(Some((a, b))),
                _ => Ok(None),
            }
        })
    })
}

/// Three-way form of [`join2`].
pub fn join3<A, B, C>(a: &DataOp<A>, b: &DataOp<B>, c: &DataOp<C>) -> DataOp<(A, B, C)>
where
    A: Send + Sync + 'static,
    B: Send + Sync + 'static,
    C: Send + Sync + 'static,
{
    let (a, b, c) = (a.clone(), b.clone(), c.clone());
    DataOp::of(move |view| {
        let all = future::join3(a.apply(view), b.apply(view), c.apply(view));
        all.map(|(a, b, c)| -> DataResult<(A, B, C)> {
            match (a?, b?, c?) {
                (Some(a), Some(b), Some(c)) => Ok(Some((a, b, c))),
                _ => Ok(None),
            }
        })
    })
}
