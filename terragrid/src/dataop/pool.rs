//! Bounded worker pool for blocking and CPU-heavy work.
//!
//! Work submitted through [`WorkerPool::run`] executes on Tokio's blocking
//! thread pool, but only after acquiring a permit from a semaphore sized to
//! the pool. This keeps raster transforms and decompression from starving
//! the async runtime or oversubscribing the CPU.
//!
//! # Usage
//!
//! ```ignore
//! use terragrid::dataop::WorkerPool;
//!
//! let pool = WorkerPool::with_defaults("raster");
//! let sum = pool.run(|| (0..1_000u64).sum::<u64>()).await?;
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::error::DataError;

/// Bounded pool dispatching closures to blocking threads.
///
/// Cloning is cheap; clones share the same permits and counters.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    /// Semaphore bounding concurrently running jobs
    semaphore: Arc<Semaphore>,

    /// Maximum permits (for stats/debugging)
    max_permits: usize,

    /// Jobs currently holding a permit
    in_flight: Arc<AtomicUsize>,

    /// Peak concurrent jobs observed
    peak_in_flight: Arc<AtomicUsize>,

    /// Label for logging (e.g., "raster", "decode")
    label: Arc<str>,
}

impl WorkerPool {
    /// Creates a pool running at most `max_concurrent` jobs at once.
    ///
    /// # Panics
    ///
    /// Panics if `max_concurrent` is 0.
    pub fn new(max_concurrent: usize, label: impl Into<String>) -> Self {
        assert!(max_concurrent > 0, "max_concurrent must be > 0");

        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_permits: max_concurrent,
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: Arc::new(AtomicUsize::new(0)),
            label: Arc::from(label.into()),
        }
    }

    /// Creates a pool sized to the available parallelism.
    pub fn with_defaults(label: impl Into<String>) -> Self {
        Self::new(default_worker_count(), label)
    }

    /// Runs `job` on a blocking thread once a permit is available.
    ///
    /// The returned future never blocks the calling thread. A panic inside
    /// `job` surfaces as [`DataError::Task`].
    pub async fn run<F, R>(&self, job: F) -> Result<R, DataError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| DataError::Task(format!("worker pool '{}' closed", self.label)))?;

        let current = self.in_flight.fetch_add(1, Ordering::Relaxed) + 1;
        self.update_peak(current);

        let in_flight = Arc::clone(&self.in_flight);
        let result = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let output = job();
            in_flight.fetch_sub(1, Ordering::Relaxed);
            output
        })
        .await;

        if result.is_err() {
            // The job panicked before it could release its slot.
            self.in_flight.fetch_sub(1, Ordering::Relaxed);
        }

        result.map_err(DataError::from)
    }

    /// Updates the peak counter if current exceeds it.
    fn update_peak(&self, current: usize) {
        let mut peak = self.peak_in_flight.load(Ordering::Relaxed);
        while current > peak {
            match self.peak_in_flight.compare_exchange_weak(
                peak,
                current,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(p) => peak = p,
            }
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_permits
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::Relaxed)
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}

/// Number of workers used when no explicit size is configured.
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(4)
}
