//! Table implementation
//!
//! Fixed-stride slot storage with free-pool reuse, doubling growth, dirty
//! tracking, and attached index maintenance.

use std::collections::VecDeque;

use crate::entry::{self, EntryHeader, EntryId, FLAG_DIRTY, FLAG_OCCUPIED, HEADER_SIZE};
use crate::error::{MemDbError, Result};
use crate::index::Index;
use crate::stats::TableStats;
use crate::variant::{NumericalVariant, VariantKind};

/// Small stable integer identifying a table within its store.
///
/// Deleting a table retires its id permanently; a table recreated under the
/// same name receives a fresh, never-before-used id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TableId(pub u32);

impl std::fmt::Display for TableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "table#{}", self.0)
    }
}

/// A homogeneous array of fixed-stride byte slots
///
/// ## Allocation order (per slot request):
/// 1. Pop the FIFO free pool
/// 2. Bump-allocate a virgin slot below capacity
/// 3. Linear-scan for a freed slot that fell out of the bounded pool
/// 4. Double capacity (buffer relocation, ids unaffected) and bump
#[derive(Debug)]
pub struct Table {
    /// Unique name within the store
    name: String,
    /// Stable id within the store
    id: TableId,
    /// Record stride in bytes, fixed at creation
    entry_size: usize,
    /// Record alignment, fixed at creation
    entry_align: usize,
    /// Slot count the buffer currently holds
    capacity: usize,
    /// Slots ever handed out; virgin slots live in `high_water..capacity`
    high_water: usize,
    /// Occupied slot count
    used: usize,
    /// Raw slot storage, `capacity × entry_size`, zero-filled
    buf: Vec<u8>,
    /// FIFO reuse pool of freed slots, bounded by `free_cache_size`
    free_pool: VecDeque<EntryId>,
    /// Bound on the reuse pool (tuning only)
    free_cache_size: usize,
    /// Ids dirtied since the last save, deduplicated via the slot dirty bit
    dirty_list: Vec<EntryId>,
    /// Buffer relocations since creation
    resize_count: u64,
    /// Attached secondary indices
    indices: Vec<Index>,
}

impl Table {
    /// Create an empty table.
    ///
    /// `entry_size`/`entry_align` describe the record layout and are fixed
    /// for the table's lifetime; every later access re-checks against them.
    pub(crate) fn new(
        name: impl Into<String>,
        id: TableId,
        entry_size: usize,
        entry_align: usize,
        capacity: usize,
        free_cache_size: usize,
    ) -> Result<Self> {
        let name = name.into();

        if entry_size < HEADER_SIZE {
            return Err(MemDbError::InvalidLayout(format!(
                "table '{}': entry size {} cannot hold the {}-byte reserved header",
                name, entry_size, HEADER_SIZE
            )));
        }
        if !entry_align.is_power_of_two() || entry_size % entry_align != 0 {
            return Err(MemDbError::InvalidLayout(format!(
                "table '{}': alignment {} incompatible with entry size {}",
                name, entry_align, entry_size
            )));
        }

        let capacity = capacity.max(1);

        Ok(Self {
            name,
            id,
            entry_size,
            entry_align,
            capacity,
            high_water: 0,
            used: 0,
            buf: vec![0u8; capacity * entry_size],
            free_pool: VecDeque::new(),
            free_cache_size,
            dirty_list: Vec::new(),
            resize_count: 0,
            indices: Vec::new(),
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> TableId {
        self.id
    }

    pub fn entry_size(&self) -> usize {
        self.entry_size
    }

    pub fn entry_align(&self) -> usize {
        self.entry_align
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn used(&self) -> usize {
        self.used
    }

    /// Slots ever handed out; the scan bound for occupied-slot iteration
    pub(crate) fn high_water(&self) -> usize {
        self.high_water
    }

    pub fn resize_count(&self) -> u64 {
        self.resize_count
    }

    pub(crate) fn stats(&self) -> TableStats {
        TableStats {
            entry_size: self.entry_size,
            entry_align: self.entry_align,
            capacity: self.capacity,
            used: self.used,
            resize_count: self.resize_count,
            free_pool_len: self.free_pool.len(),
            dirty_count: self.dirty_list.len(),
            index_count: self.indices.len(),
        }
    }

    /// Verify a caller-supplied record layout against the table's.
    ///
    /// A mismatch means the caller is using the wrong record type for this
    /// table; it fails fast before any byte is read or written.
    pub(crate) fn check_layout(&self, size: usize, align: usize) -> Result<()> {
        if size != self.entry_size || align != self.entry_align {
            return Err(MemDbError::LayoutMismatch {
                expected_size: self.entry_size,
                expected_align: self.entry_align,
                got_size: size,
                got_align: align,
            });
        }
        Ok(())
    }

    // =========================================================================
    // Slot Allocation
    // =========================================================================

    /// Hand out a free slot, growing the buffer if every slot is occupied.
    ///
    /// The returned slot's bytes are unspecified until `write_record`.
    pub(crate) fn allocate_slot(&mut self) -> EntryId {
        // Fast path: bounded reuse pool
        if let Some(id) = self.free_pool.pop_front() {
            return id;
        }

        // Virgin slot below capacity
        if self.high_water < self.capacity {
            let id = EntryId(self.high_water as u32);
            self.high_water += 1;
            return id;
        }

        // Freed slots that fell out of the bounded pool stay reclaimable,
        // just not at pool speed
        if self.used < self.high_water {
            for slot in 0..self.high_water {
                if !self.slot_occupied(slot) {
                    return EntryId(slot as u32);
                }
            }
        }

        // Everything occupied: double capacity and bump
        self.grow();
        let id = EntryId(self.high_water as u32);
        self.high_water += 1;
        id
    }

    /// Double the slot capacity, relocating the buffer. EntryIds are slot
    /// indices, so relocation invalidates nothing.
    fn grow(&mut self) {
        let new_capacity = self.capacity * 2;
        self.buf.resize(new_capacity * self.entry_size, 0);
        self.capacity = new_capacity;
        self.resize_count += 1;

        tracing::debug!(
            table = %self.name,
            capacity = new_capacity,
            resizes = self.resize_count,
            "table grown"
        );
    }

    /// Release an occupied slot: prune attached indices, clear flags, and
    /// return the slot to the reuse pool if the pool has room.
    ///
    /// Returns `false` (a no-op) if the slot is already free or out of range.
    pub(crate) fn free_slot(&mut self, id: EntryId) -> bool {
        if !self.is_occupied(id) {
            return false;
        }

        self.index_remove(id);

        let range = self.slot_range(id);
        let slot = &mut self.buf[range];
        entry::write_header(
            slot,
            EntryHeader {
                id: EntryId::INVALID,
                flags: 0,
            },
        );
        slot[HEADER_SIZE..].fill(0);

        self.used -= 1;
        self.dirty_list.retain(|&d| d != id);

        if self.free_pool.len() < self.free_cache_size {
            self.free_pool.push_back(id);
        }
        true
    }

    /// Copy a record into an allocated slot, stamping the assigned id and
    /// the occupied+dirty flags over whatever header bytes the caller
    /// supplied. Maintains `used` and the dirty list.
    pub(crate) fn write_record(&mut self, id: EntryId, record: &[u8]) {
        let was_occupied = self.is_occupied(id);
        let range = self.slot_range(id);

        self.buf[range].copy_from_slice(record);
        let slot = self.slot_range(id);
        entry::write_header(
            &mut self.buf[slot],
            EntryHeader {
                id,
                flags: FLAG_OCCUPIED | FLAG_DIRTY,
            },
        );

        if !was_occupied {
            self.used += 1;
        }
        if !self.dirty_list.contains(&id) {
            self.dirty_list.push(id);
        }
    }

    // =========================================================================
    // Slot Access
    // =========================================================================

    fn slot_range(&self, id: EntryId) -> std::ops::Range<usize> {
        let start = id.index() * self.entry_size;
        start..start + self.entry_size
    }

    fn slot_occupied(&self, slot: usize) -> bool {
        let start = slot * self.entry_size;
        entry::header_of(&self.buf[start..start + self.entry_size]).occupied()
    }

    /// True if `id` addresses an occupied slot
    pub(crate) fn is_occupied(&self, id: EntryId) -> bool {
        id.is_valid() && id.index() < self.high_water && self.slot_occupied(id.index())
    }

    /// Raw bytes of an occupied slot
    pub(crate) fn slot_bytes(&self, id: EntryId) -> Option<&[u8]> {
        if !self.is_occupied(id) {
            return None;
        }
        Some(&self.buf[self.slot_range(id)])
    }

    /// Occupied slot ids in ascending order
    pub(crate) fn occupied_ids(&self) -> impl Iterator<Item = EntryId> + '_ {
        (0..self.high_water)
            .filter(|&slot| self.slot_occupied(slot))
            .map(|slot| EntryId(slot as u32))
    }

    // =========================================================================
    // Dirty Tracking
    // =========================================================================

    /// True if `id` is occupied and was modified since the last save
    pub(crate) fn is_dirty(&self, id: EntryId) -> bool {
        self.slot_bytes(id)
            .map(|slot| entry::header_of(slot).dirty())
            .unwrap_or(false)
    }

    /// Accumulated dirty ids since the last save
    pub(crate) fn dirty_ids(&self) -> &[EntryId] {
        &self.dirty_list
    }

    /// Clear the dirty bit on every slot and drop the accumulated list
    /// (called after a successful save)
    pub(crate) fn clear_dirty(&mut self) {
        for slot in 0..self.high_water {
            let start = slot * self.entry_size;
            let end = start + self.entry_size;
            if entry::header_of(&self.buf[start..end]).occupied() {
                entry::update_flags(&mut self.buf[start..end], 0, FLAG_DIRTY);
            }
        }
        self.dirty_list.clear();
    }

    /// Tune the reuse-pool bound. Correctness-neutral: shrinking evicts
    /// pooled slots, which stay free and reachable by the linear scan.
    pub(crate) fn set_free_cache(&mut self, size: usize) {
        self.free_cache_size = size;
        self.free_pool.truncate(size);
    }

    // =========================================================================
    // Index Maintenance
    // =========================================================================
    // Indices are updated in the same critical section as the data change.
    // Uniqueness is pre-checked before any mutation, so the insert half can
    // never fail and data/indices never diverge.

    pub(crate) fn indices(&self) -> &[Index] {
        &self.indices
    }

    /// Attach a new index, built from one scan of the occupied slots
    pub(crate) fn attach_index(&mut self, mut index: Index) -> Result<()> {
        for id in self.occupied_ids().collect::<Vec<_>>() {
            let record = &self.buf[self.slot_range(id)];
            let key = index.key_of(record)?;
            if !index.allow_duplicates() && index.contains(&key) {
                return Err(MemDbError::DuplicateKey(format!(
                    "table '{}' already holds {} twice; unique index refused",
                    self.name, key
                )));
            }
            index.insert(key, id);
        }

        tracing::debug!(
            table = %self.name,
            offset = index.offset(),
            keys = index.key_count(),
            "index built"
        );
        self.indices.push(index);
        Ok(())
    }

    /// Find an attached index over the given (offset, kind) pair
    pub(crate) fn index_covering(&self, kind: VariantKind, offset: usize) -> Option<&Index> {
        self.indices.iter().find(|ix| ix.covers(kind, offset))
    }

    /// Reject `record` if writing it (as `exclude`, for updates) would put a
    /// second holder under any unique index key. Runs before any mutation.
    pub(crate) fn check_unique(&self, record: &[u8], exclude: Option<EntryId>) -> Result<()> {
        for index in &self.indices {
            if index.allow_duplicates() {
                continue;
            }
            let key = index.key_of(record)?;
            let holders = index.find_all(&key);
            let conflict = match exclude {
                Some(id) => holders.iter().any(|&h| h != id),
                None => !holders.is_empty(),
            };
            if conflict {
                return Err(MemDbError::DuplicateKey(format!(
                    "table '{}' field at offset {}: {}",
                    self.name,
                    index.offset(),
                    key
                )));
            }
        }
        Ok(())
    }

    /// Register an occupied slot's keys with every attached index
    pub(crate) fn index_insert(&mut self, id: EntryId) -> Result<()> {
        let record = &self.buf[self.slot_range(id)];
        let keys: Vec<NumericalVariant> = self
            .indices
            .iter()
            .map(|ix| ix.key_of(record))
            .collect::<Result<_>>()?;

        for (index, key) in self.indices.iter_mut().zip(keys) {
            index.insert(key, id);
        }
        Ok(())
    }

    /// Remove a slot's keys from every attached index (slot still occupied)
    pub(crate) fn index_remove(&mut self, id: EntryId) {
        let range = self.slot_range(id);
        let record = &self.buf[range];
        let keys: Vec<Option<NumericalVariant>> = self
            .indices
            .iter()
            .map(|ix| ix.key_of(record).ok())
            .collect();

        for (index, key) in self.indices.iter_mut().zip(keys) {
            if let Some(key) = key {
                index.remove(&key, id);
            }
        }
    }

    // =========================================================================
    // Snapshot Support
    // =========================================================================

    /// Drop every record, index entry, and allocation mark. Capacity is
    /// kept; the buffer is zeroed so all slots read as unoccupied.
    pub(crate) fn clear(&mut self) {
        self.buf.fill(0);
        self.high_water = 0;
        self.used = 0;
        self.free_pool.clear();
        self.dirty_list.clear();
        let old: Vec<Index> = std::mem::take(&mut self.indices);
        self.indices = old
            .into_iter()
            .map(|ix| Index::new(ix.kind(), ix.offset(), ix.allow_duplicates()))
            .collect();
    }

    /// Place a record at the exact slot its embedded id names, growing as
    /// needed. Used by snapshot replay to reproduce id assignment; the
    /// loaded slot is occupied but clean (not dirty).
    pub(crate) fn place_record(&mut self, id: EntryId, record: &[u8]) -> Result<()> {
        if !id.is_valid() {
            return Err(MemDbError::Corruption(format!(
                "table '{}': snapshot names the invalid entry id",
                self.name
            )));
        }
        while id.index() >= self.capacity {
            self.grow();
        }
        if id.index() >= self.high_water {
            self.high_water = id.index() + 1;
        }
        if self.slot_occupied(id.index()) {
            return Err(MemDbError::Corruption(format!(
                "table '{}': snapshot names entry {} twice",
                self.name, id
            )));
        }

        let range = self.slot_range(id);
        self.buf[range].copy_from_slice(record);
        let slot = self.slot_range(id);
        entry::write_header(
            &mut self.buf[slot],
            EntryHeader {
                id,
                flags: FLAG_OCCUPIED,
            },
        );
        self.used += 1;
        Ok(())
    }

    /// Rebuild the reuse pool and indices after snapshot replay
    pub(crate) fn rebuild_after_load(&mut self) -> Result<()> {
        self.free_pool.clear();
        for slot in 0..self.high_water {
            if self.free_pool.len() >= self.free_cache_size {
                break;
            }
            if !self.slot_occupied(slot) {
                self.free_pool.push_back(EntryId(slot as u32));
            }
        }

        for id in self.occupied_ids().collect::<Vec<_>>() {
            self.index_insert(id)?;
        }
        Ok(())
    }
}
