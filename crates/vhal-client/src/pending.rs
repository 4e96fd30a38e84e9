//! Pending request bookkeeping
//!
//! One table entry per in-flight get or set: a single-assignment result
//! slot keyed by the request id. Removal from the table is the single
//! arbiter of the timeout-vs-callback race: whichever side removes the
//! entry owns the outcome, and the loser finds nothing and backs off
//! silently. The table mutex guards map mutation only, never a wait.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::debug;
use vhal_core::{GetValueResult, SetValueResult};

/// Allocates correlation ids: strictly increasing, never reused, shared by
/// get and set traffic. 64 bits do not roll over in practice.
#[derive(Debug)]
pub struct RequestIdAllocator {
    next: AtomicU64,
}

impl RequestIdAllocator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    pub fn allocate(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for RequestIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

struct PendingEntry<T> {
    slot: oneshot::Sender<T>,
    created_at: Instant,
}

/// Concurrency-safe map from request id to its unfulfilled result slot.
pub struct PendingRequestTable<T> {
    entries: Mutex<HashMap<u64, PendingEntry<T>>>,
}

impl<T: Send> PendingRequestTable<T> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Insert a fresh entry and hand back the receiving half of its slot.
    pub fn register(&self, request_id: u64) -> oneshot::Receiver<T> {
        let (tx, rx) = oneshot::channel();
        let entry = PendingEntry {
            slot: tx,
            created_at: Instant::now(),
        };
        let previous = self.entries.lock().insert(request_id, entry);
        debug_assert!(previous.is_none(), "request id {request_id} reused");
        rx
    }

    /// Deliver a result into the slot for `request_id`, exactly once.
    ///
    /// Returns false when no entry exists: the request already timed out
    /// or was evicted, and the late result is dropped. The send happens
    /// after the table lock is released; a receiver that vanished between
    /// removal and send simply discards the value.
    pub fn resolve(&self, request_id: u64, result: T) -> bool {
        let entry = self.entries.lock().remove(&request_id);
        match entry {
            Some(entry) => {
                let _ = entry.slot.send(result);
                true
            }
            None => {
                debug!(request_id, "dropping result for unknown request");
                false
            }
        }
    }

    /// Remove an entry without fulfilling it. Idempotent: evicting an
    /// absent id is a no-op returning false.
    pub fn evict(&self, request_id: u64) -> bool {
        self.entries.lock().remove(&request_id).is_some()
    }

    /// Drop entries older than `max_age`; their receivers observe a closed
    /// slot. Backstop for callers whose wait future was dropped.
    pub fn purge_stale(&self, max_age: Duration) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.created_at.elapsed() <= max_age);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl<T: Send> Default for PendingRequestTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared correlation state: one id space, one table per result shape.
pub struct PendingRequests {
    ids: RequestIdAllocator,
    pub gets: PendingRequestTable<GetValueResult>,
    pub sets: PendingRequestTable<SetValueResult>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self {
            ids: RequestIdAllocator::new(),
            gets: PendingRequestTable::new(),
            sets: PendingRequestTable::new(),
        }
    }

    pub fn allocate_id(&self) -> u64 {
        self.ids.allocate()
    }

    pub fn total_pending(&self) -> usize {
        self.gets.len() + self.sets.len()
    }

    pub fn purge_stale(&self, max_age: Duration) -> usize {
        self.gets.purge_stale(max_age) + self.sets.purge_stale(max_age)
    }
}

impl Default for PendingRequests {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use vhal_core::StatusCode;

    #[test]
    fn ids_are_unique_and_increasing() {
        let allocator = RequestIdAllocator::new();
        let mut last = 0;
        for _ in 0..1000 {
            let id = allocator.allocate();
            assert!(id > last);
            last = id;
        }
    }

    #[test]
    fn ids_are_unique_across_threads() {
        let allocator = Arc::new(RequestIdAllocator::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let allocator = allocator.clone();
            handles.push(std::thread::spawn(move || {
                (0..500).map(|_| allocator.allocate()).collect::<Vec<_>>()
            }));
        }
        let mut all: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort_unstable();
        let len = all.len();
        all.dedup();
        assert_eq!(all.len(), len);
    }

    #[test]
    fn resolve_fulfills_the_slot_once() {
        let table = PendingRequestTable::new();
        let mut rx = table.register(7);
        assert_eq!(table.len(), 1);

        assert!(table.resolve(
            7,
            SetValueResult {
                request_id: 7,
                status: StatusCode::Ok,
            }
        ));
        assert!(table.is_empty());
        assert_eq!(rx.try_recv().unwrap().status, StatusCode::Ok);

        // second resolution finds nothing and is a silent no-op
        assert!(!table.resolve(
            7,
            SetValueResult {
                request_id: 7,
                status: StatusCode::InternalError,
            }
        ));
    }

    #[test]
    fn resolved_value_reaches_the_waiter() {
        let table = PendingRequestTable::new();
        let rx = table.register(21);
        assert!(table.resolve(
            21,
            SetValueResult {
                request_id: 21,
                status: StatusCode::Ok,
            }
        ));
        let result = tokio_test::block_on(rx).unwrap();
        assert_eq!(result.request_id, 21);
    }

    #[test]
    fn eviction_is_idempotent() {
        let table: PendingRequestTable<SetValueResult> = PendingRequestTable::new();
        let _rx = table.register(3);
        assert!(table.evict(3));
        assert!(!table.evict(3));
        assert!(!table.evict(99));
        assert!(table.is_empty());
    }

    #[test]
    fn resolve_after_eviction_is_dropped() {
        let table = PendingRequestTable::new();
        let mut rx = table.register(11);
        assert!(table.evict(11));
        assert!(!table.resolve(
            11,
            SetValueResult {
                request_id: 11,
                status: StatusCode::Ok,
            }
        ));
        // the slot was closed, never fulfilled
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn purge_drops_only_stale_entries() {
        let table: PendingRequestTable<SetValueResult> = PendingRequestTable::new();
        let _rx_old = table.register(1);
        std::thread::sleep(Duration::from_millis(30));
        let _rx_new = table.register(2);

        let evicted = table.purge_stale(Duration::from_millis(15));
        assert_eq!(evicted, 1);
        assert_eq!(table.len(), 1);
        assert!(!table.evict(1));
        assert!(table.evict(2));
    }

    #[test]
    fn shared_id_space_across_both_tables() {
        let pending = PendingRequests::new();
        let a = pending.allocate_id();
        let _rx = pending.gets.register(a);
        let b = pending.allocate_id();
        let _rx = pending.sets.register(b);
        assert!(b > a);
        assert_eq!(pending.total_pending(), 2);
    }
}
