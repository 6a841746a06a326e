//! Request coalescing for tile loads.
//!
//! When several data ops ask for the same tile at once, only the first
//! request performs the load. Every other caller subscribes to the in-flight
//! request and receives a clone of the same result.
//!
//! # Architecture
//!
//! ```text
//! Op A ─┐
//!       │                               TileCache
//! Op B ─┼──► RequestCoalescer ───────► spawned fetch
//!       │          │                        │
//! Op C ─┘          ▼                        ▼
//!            [A, B, C all              [one fetch]
//!             receive same                  │
//!             result]◄──────────────────────┘
//! ```
//!
//! Uses `DashMap`'s entry API so the check-and-insert is atomic, and atomic
//! counters for statistics.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::debug;

/// Tracks in-flight requests so duplicates can share one result.
pub struct RequestCoalescer<K, V> {
    /// In-flight requests: key -> broadcast sender for the result
    in_flight: DashMap<K, broadcast::Sender<V>>,
    total_requests: AtomicU64,
    coalesced_requests: AtomicU64,
    new_requests: AtomicU64,
}

/// Statistics for monitoring coalescing effectiveness.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CoalescerStats {
    /// Total requests received
    pub total_requests: u64,
    /// Requests that waited for existing work
    pub coalesced_requests: u64,
    /// Requests that triggered new work
    pub new_requests: u64,
}

impl CoalescerStats {
    /// Returns the coalescing ratio (0.0 to 1.0)
    pub fn coalescing_ratio(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.coalesced_requests as f64 / self.total_requests as f64
        }
    }
}

/// Result of registering a request.
pub enum CoalesceResult<V> {
    /// First request for the key; the caller must perform the work and call
    /// [`RequestCoalescer::complete`]. The receiver yields the broadcast
    /// result like any other waiter.
    NewRequest(broadcast::Receiver<V>),
    /// Work is already in flight; wait on the receiver.
    Coalesced(broadcast::Receiver<V>),
}

impl<V> CoalesceResult<V> {
    pub fn is_new_request(&self) -> bool {
        matches!(self, Self::NewRequest(_))
    }

    /// The receiver for the eventual result, whichever side this is.
    pub fn into_receiver(self) -> broadcast::Receiver<V> {
        match self {
            Self::NewRequest(rx) | Self::Coalesced(rx) => rx,
        }
    }
}

impl<K, V> RequestCoalescer<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            in_flight: DashMap::new(),
            total_requests: AtomicU64::new(0),
            coalesced_requests: AtomicU64::new(0),
            new_requests: AtomicU64::new(0),
        }
    }

    /// Registers a request for `key`.
    pub fn register(&self, key: K) -> CoalesceResult<V> {
        self.total_requests.fetch_add(1, Ordering::Relaxed);

        match self.in_flight.entry(key) {
            Entry::Occupied(entry) => {
                let rx = entry.get().subscribe();
                self.coalesced_requests.fetch_add(1, Ordering::Relaxed);
                debug!(key = ?entry.key(), "Coalescing request - waiting for in-flight load");
                CoalesceResult::Coalesced(rx)
            }
            Entry::Vacant(entry) => {
                // Exactly one result is ever sent
                let (tx, rx) = broadcast::channel(1);
                debug!(key = ?entry.key(), "New request - starting load");
                entry.insert(tx);
                self.new_requests.fetch_add(1, Ordering::Relaxed);
                CoalesceResult::NewRequest(rx)
            }
        }
    }

    /// Completes a request, broadcasting `result` to all waiters.
    pub fn complete(&self, key: &K, result: V) {
        if let Some((_, tx)) = self.in_flight.remove(key) {
            let waiters = tx.receiver_count();
            // Receivers may have been dropped; the result is simply discarded
            let _ = tx.send(result);
            debug!(key = ?key, waiters, "Broadcast load result");
        }
    }

    pub fn stats(&self) -> CoalescerStats {
        CoalescerStats {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            coalesced_requests: self.coalesced_requests.load(Ordering::Relaxed),
            new_requests: self.new_requests.load(Ordering::Relaxed),
        }
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }
}

impl<K, V> Default for RequestCoalescer<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_request_is_new() {
        let coalescer: RequestCoalescer<u32, u8> = RequestCoalescer::new();
        assert!(coalescer.register(1).is_new_request());
        assert_eq!(coalescer.in_flight_count(), 1);
    }

    #[test]
    fn test_duplicate_is_coalesced() {
        let coalescer: RequestCoalescer<u32, u8> = RequestCoalescer::new();
        let _first = coalescer.register(1);
        let second = coalescer.register(1);

        assert!(!second.is_new_request());
        let stats = coalescer.stats();
        assert_eq!(stats.total_requests, 2);
        assert_eq!(stats.coalesced_requests, 1);
        assert_eq!(stats.new_requests, 1);
        assert!((stats.coalescing_ratio() - 0.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_complete_reaches_every_waiter() {
        let coalescer: RequestCoalescer<&str, u8> = RequestCoalescer::new();
        let mut first = coalescer.register("tile").into_receiver();
        let mut second = coalescer.register("tile").into_receiver();

        coalescer.complete(&"tile", 9);

        assert_eq!(first.recv().await.unwrap(), 9);
        assert_eq!(second.recv().await.unwrap(), 9);
        assert_eq!(coalescer.in_flight_count(), 0);
    }

    #[test]
    fn test_key_is_new_again_after_complete() {
        let coalescer: RequestCoalescer<u32, u8> = RequestCoalescer::new();
        let _ = coalescer.register(5);
        coalescer.complete(&5, 0);
        assert!(coalescer.register(5).is_new_request());
    }

    #[test]
    fn test_complete_unknown_key_is_noop() {
        let coalescer: RequestCoalescer<u32, u8> = RequestCoalescer::new();
        coalescer.complete(&7, 1);
        assert_eq!(coalescer.in_flight_count(), 0);
    }
}
