//! Store statistics
//!
//! Byte-usage and per-operation counters, informational only. Counters are
//! plain atomics updated outside the big store lock, so `Store::stats()`
//! never blocks behind a writer; readers may observe values that lag an
//! in-flight mutation by a few increments.

use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counter block owned by the store
#[derive(Debug, Default)]
pub(crate) struct Counters {
    /// Total buffer bytes allocated across live tables (capacity × stride)
    pub bytes_allocated: AtomicU64,
    /// Bytes of occupied slots across live tables (used × stride)
    pub bytes_used: AtomicU64,

    pub inserts: AtomicU64,
    pub updates: AtomicU64,
    pub deletes: AtomicU64,
    pub finds: AtomicU64,
    pub selects: AtomicU64,
    pub saves: AtomicU64,
    pub loads: AtomicU64,
}

impl Counters {
    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn sub(counter: &AtomicU64, n: u64) {
        counter.fetch_sub(n, Ordering::Relaxed);
    }

    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StoreStats {
        StoreStats {
            bytes_allocated: self.bytes_allocated.load(Ordering::Relaxed),
            bytes_used: self.bytes_used.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            finds: self.finds.load(Ordering::Relaxed),
            selects: self.selects.load(Ordering::Relaxed),
            saves: self.saves.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
        }
    }

    /// Zero everything (used by `Store::release()`)
    pub fn reset(&self) {
        self.bytes_allocated.store(0, Ordering::Relaxed);
        self.bytes_used.store(0, Ordering::Relaxed);
        self.inserts.store(0, Ordering::Relaxed);
        self.updates.store(0, Ordering::Relaxed);
        self.deletes.store(0, Ordering::Relaxed);
        self.finds.store(0, Ordering::Relaxed);
        self.selects.store(0, Ordering::Relaxed);
        self.saves.store(0, Ordering::Relaxed);
        self.loads.store(0, Ordering::Relaxed);
    }
}

/// Point-in-time snapshot of store-wide counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub bytes_allocated: u64,
    pub bytes_used: u64,
    pub inserts: u64,
    pub updates: u64,
    pub deletes: u64,
    pub finds: u64,
    pub selects: u64,
    pub saves: u64,
    pub loads: u64,
}

/// Point-in-time snapshot of one table's storage state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableStats {
    pub entry_size: usize,
    pub entry_align: usize,
    pub capacity: usize,
    pub used: usize,
    /// Number of buffer relocations since creation
    pub resize_count: u64,
    /// Slots currently waiting in the fast-reuse pool
    pub free_pool_len: usize,
    pub dirty_count: usize,
    pub index_count: usize,
}
