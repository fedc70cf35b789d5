//! Store Module
//!
//! The façade that owns every table and coordinates all components.
//!
//! ## Responsibilities
//! - Table registry (unique names, never-reused TableIds)
//! - CRUD and predicate/indexed finds with layout validation
//! - Index creation and eager maintenance
//! - Persistence entry points (per-table files, whole-database save/load,
//!   caller-supplied sinks)
//! - Global statistics
//!
//! ## Concurrency Model: One Coarse Reader-Writer Lock
//!
//! A single `parking_lot::RwLock` guards the table registry, every table's
//! storage, and every index. This is a deliberate, documented scalability
//! ceiling: the store targets small/medium embedded datasets, not
//! high-concurrency OLTP.
//!
//! - **Exclusive**: insert, update, delete, bulk-insert, create/delete
//!   table, create index, every persistence call. Save/load perform file
//!   I/O while holding the lock — do not call them from latency-sensitive
//!   threads.
//! - **Shared**: predicate scans and indexed finds. Indices are maintained
//!   eagerly on every mutation, never rebuilt on read, so reads never
//!   escalate.
//! - **No lock**: `stats()` reads separate atomic counters; values may lag
//!   an in-flight mutation.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::mem;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use crate::config::Config;
use crate::entry::{self, EntryId, Record};
use crate::error::{MemDbError, Result};
use crate::index::Index;
use crate::persist::{self, EntryWriter, SaveMode, Snapshot, SnapshotHeader};
use crate::stats::{Counters, StoreStats, TableStats};
use crate::table::{Table, TableId};
use crate::variant::{NumericalVariant, VariantKind};

/// Extension of per-table snapshot files under the bound data directory
const SNAPSHOT_EXT: &str = "mdb";

/// The embedded table store
pub struct Store {
    /// Store configuration
    config: Config,

    /// Registry + tables + indices, all behind the one coarse lock
    inner: RwLock<StoreInner>,

    /// Lock-free statistics counters
    counters: Counters,
}

/// Everything the coarse lock guards
struct StoreInner {
    /// Live tables by id
    tables: HashMap<TableId, Table>,

    /// Name → id registry; names become reusable after delete, ids do not
    names: HashMap<String, TableId>,

    /// Monotonic id source; deleted ids are tombstoned by never rewinding
    next_table_id: u32,

    /// Persistence root bound by `open()`
    data_dir: Option<PathBuf>,
}

impl StoreInner {
    fn table(&self, id: TableId) -> Result<&Table> {
        self.tables
            .get(&id)
            .ok_or_else(|| MemDbError::TableNotFound(id.to_string()))
    }

    fn table_mut(&mut self, id: TableId) -> Result<&mut Table> {
        self.tables
            .get_mut(&id)
            .ok_or_else(|| MemDbError::TableNotFound(id.to_string()))
    }
}

impl Store {
    /// Create an empty store with default configuration
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create an empty store with the given configuration
    pub fn with_config(config: Config) -> Self {
        let data_dir = config.data_dir.clone();
        Self {
            config,
            inner: RwLock::new(StoreInner {
                tables: HashMap::new(),
                names: HashMap::new(),
                next_table_id: 0,
                data_dir,
            }),
            counters: Counters::default(),
        }
    }

    // =========================================================================
    // Table Registry
    // =========================================================================

    /// Create a table for records of the given byte layout.
    ///
    /// Default slot capacity is sized for roughly the configured byte budget
    /// (~1KB) of records. Fails if the name is taken.
    pub fn create_table(&self, name: &str, entry_size: usize, entry_align: usize) -> Result<TableId> {
        let capacity = (self.config.default_capacity_bytes / entry_size.max(1)).max(1);
        self.create_table_with_capacity(name, entry_size, entry_align, capacity)
    }

    /// Create a table with an explicit initial slot capacity
    pub fn create_table_with_capacity(
        &self,
        name: &str,
        entry_size: usize,
        entry_align: usize,
        capacity: usize,
    ) -> Result<TableId> {
        // Names become snapshot filenames; a separator would escape the
        // bound data directory
        if name.is_empty()
            || name.contains('/')
            || name.contains('\\')
            || name.contains("..")
        {
            return Err(MemDbError::InvalidTableName(name.to_string()));
        }

        let mut inner = self.inner.write();

        if inner.names.contains_key(name) {
            return Err(MemDbError::TableExists(name.to_string()));
        }

        let id = TableId(inner.next_table_id);
        let table = Table::new(
            name,
            id,
            entry_size,
            entry_align,
            capacity,
            self.config.free_cache_size,
        )?;

        Counters::add(
            &self.counters.bytes_allocated,
            (table.capacity() * entry_size) as u64,
        );

        inner.next_table_id += 1;
        inner.names.insert(name.to_string(), id);
        inner.tables.insert(id, table);

        tracing::debug!(table = name, id = id.0, entry_size, capacity, "table created");
        Ok(id)
    }

    /// Create a table sized for a concrete record type
    pub fn create_table_for<R: Record>(&self, name: &str) -> Result<TableId> {
        self.create_table(name, mem::size_of::<R>(), mem::align_of::<R>())
    }

    /// Delete a table by name, retiring its id permanently.
    ///
    /// Returns `Ok(false)` if no such table exists (expected miss).
    pub fn delete_table(&self, name: &str) -> Result<bool> {
        let id = {
            let inner = self.inner.read();
            match inner.names.get(name) {
                Some(&id) => id,
                None => return Ok(false),
            }
        };
        self.delete_table_by_id(id)
    }

    /// Delete a table by id, retiring the id permanently
    pub fn delete_table_by_id(&self, id: TableId) -> Result<bool> {
        let mut inner = self.inner.write();

        let Some(table) = inner.tables.remove(&id) else {
            return Ok(false);
        };
        inner.names.remove(table.name());

        Counters::sub(
            &self.counters.bytes_allocated,
            (table.capacity() * table.entry_size()) as u64,
        );
        Counters::sub(
            &self.counters.bytes_used,
            (table.used() * table.entry_size()) as u64,
        );

        tracing::debug!(table = table.name(), id = id.0, "table deleted");
        Ok(true)
    }

    /// Look up a table id by name
    pub fn find_table(&self, name: &str) -> Option<TableId> {
        self.inner.read().names.get(name).copied()
    }

    // =========================================================================
    // Index Creation
    // =========================================================================

    /// Build a secondary index over one numeric field of a table.
    ///
    /// `offset` is the field's byte offset within the record; `kind` its
    /// type tag. Fails on an unknown table, an out-of-bounds field, or a
    /// second index over the same (offset, kind) pair. With
    /// `allow_duplicates=false`, existing data holding a key twice also
    /// fails the build, leaving the table unindexed.
    pub fn create_index(
        &self,
        table: TableId,
        kind: VariantKind,
        offset: usize,
        allow_duplicates: bool,
    ) -> Result<()> {
        let mut inner = self.inner.write();
        let table = inner.table_mut(table)?;

        if kind == VariantKind::None {
            return Err(MemDbError::InvalidIndex(
                "cannot index the NONE variant kind".to_string(),
            ));
        }
        if offset + kind.width() > table.entry_size() {
            return Err(MemDbError::InvalidIndex(format!(
                "field at offset {} width {} exceeds entry size {}",
                offset,
                kind.width(),
                table.entry_size()
            )));
        }
        if table.index_covering(kind, offset).is_some() {
            return Err(MemDbError::IndexExists(format!(
                "table '{}' offset {}",
                table.name(),
                offset
            )));
        }

        table.attach_index(Index::new(kind, offset, allow_duplicates))
    }

    // =========================================================================
    // CRUD
    // =========================================================================

    /// Insert a record, returning its assigned id.
    ///
    /// The stored copy gets the id and occupied flag stamped into its
    /// header; the caller's value is untouched.
    pub fn insert<R: Record>(&self, table: TableId, record: &R) -> Result<EntryId> {
        self.insert_raw(table, bytemuck::bytes_of(record), mem::align_of::<R>())
    }

    /// Type-erased insert for callers working in raw bytes
    pub fn insert_raw(&self, table: TableId, record: &[u8], align: usize) -> Result<EntryId> {
        let mut inner = self.inner.write();
        let table = inner.table_mut(table)?;

        table.check_layout(record.len(), align)?;
        table.check_unique(record, None)?;

        let cap_before = table.capacity();
        let id = table.allocate_slot();
        table.write_record(id, record);
        table.index_insert(id)?;

        self.track_growth(cap_before, table);
        Counters::add(&self.counters.bytes_used, table.entry_size() as u64);
        Counters::bump(&self.counters.inserts);
        Ok(id)
    }

    /// Insert many records as one atomic unit.
    ///
    /// Either every record is inserted (ids returned in order) or none is:
    /// layout and unique-key conflicts — including collisions within the
    /// batch itself — are detected before the first slot is allocated.
    pub fn bulk_insert<R: Record>(&self, table: TableId, records: &[R]) -> Result<Vec<EntryId>> {
        let mut inner = self.inner.write();
        let table = inner.table_mut(table)?;

        table.check_layout(mem::size_of::<R>(), mem::align_of::<R>())?;

        // All-or-nothing: validate the entire batch up front
        for record in records {
            table.check_unique(bytemuck::bytes_of(record), None)?;
        }
        for index in table.indices() {
            if index.allow_duplicates() {
                continue;
            }
            let mut batch_keys = BTreeSet::new();
            for record in records {
                let key = index.key_of(bytemuck::bytes_of(record))?;
                if !batch_keys.insert(key) {
                    return Err(MemDbError::DuplicateKey(format!(
                        "bulk insert collides with itself on field at offset {}: {}",
                        index.offset(),
                        key
                    )));
                }
            }
        }

        let cap_before = table.capacity();
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            let id = table.allocate_slot();
            table.write_record(id, bytemuck::bytes_of(record));
            if let Err(e) = table.index_insert(id) {
                // Unreachable after the pre-checks, but never leave a
                // partial batch observable
                table.free_slot(id);
                for &allocated in ids.iter().rev() {
                    table.free_slot(allocated);
                }
                return Err(e);
            }
            ids.push(id);
        }

        self.track_growth(cap_before, table);
        Counters::add(
            &self.counters.bytes_used,
            (records.len() * table.entry_size()) as u64,
        );
        Counters::add(&self.counters.inserts, records.len() as u64);
        Ok(ids)
    }

    /// Overwrite an occupied record, re-keying every index.
    ///
    /// Returns `Ok(false)` if `id` is not occupied (expected miss).
    pub fn update_one<R: Record>(&self, table: TableId, id: EntryId, record: &R) -> Result<bool> {
        let mut inner = self.inner.write();
        let table = inner.table_mut(table)?;

        table.check_layout(mem::size_of::<R>(), mem::align_of::<R>())?;
        if !table.is_occupied(id) {
            return Ok(false);
        }

        let bytes = bytemuck::bytes_of(record);
        table.check_unique(bytes, Some(id))?;

        table.index_remove(id);
        table.write_record(id, bytes);
        table.index_insert(id)?;

        Counters::bump(&self.counters.updates);
        Ok(true)
    }

    /// Delete a record: indices pruned, slot freed.
    ///
    /// Returns `Ok(false)` if the id is already free or invalid (expected
    /// miss; deleting twice is a no-op).
    pub fn delete(&self, table: TableId, id: EntryId) -> Result<bool> {
        let mut inner = self.inner.write();
        let table = inner.table_mut(table)?;

        if !table.free_slot(id) {
            return Ok(false);
        }

        Counters::sub(&self.counters.bytes_used, table.entry_size() as u64);
        Counters::bump(&self.counters.deletes);
        Ok(true)
    }

    // =========================================================================
    // Finds (shared lock)
    // =========================================================================

    /// First occupied record satisfying the predicate, scanning slots in
    /// ascending order
    pub fn find_one<R: Record>(
        &self,
        table: TableId,
        predicate: impl Fn(&R) -> bool,
    ) -> Result<Option<EntryId>> {
        let inner = self.inner.read();
        let table = inner.table(table)?;
        table.check_layout(mem::size_of::<R>(), mem::align_of::<R>())?;

        Counters::bump(&self.counters.finds);
        for id in table.occupied_ids() {
            let Some(slot) = table.slot_bytes(id) else {
                continue;
            };
            let record: R = bytemuck::pod_read_unaligned(slot);
            if predicate(&record) {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }

    /// Every occupied record satisfying the predicate, in ascending slot
    /// order
    pub fn find_all<R: Record>(
        &self,
        table: TableId,
        predicate: impl Fn(&R) -> bool,
    ) -> Result<Vec<EntryId>> {
        let inner = self.inner.read();
        let table = inner.table(table)?;
        table.check_layout(mem::size_of::<R>(), mem::align_of::<R>())?;

        Counters::bump(&self.counters.finds);
        let mut ids = Vec::new();
        for id in table.occupied_ids() {
            let Some(slot) = table.slot_bytes(id) else {
                continue;
            };
            let record: R = bytemuck::pod_read_unaligned(slot);
            if predicate(&record) {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    /// Point query against the index on the field at `offset`.
    ///
    /// When duplicates exist, answers with the earliest-inserted match.
    /// An unknown index is an error, never a silent scan fallback.
    pub fn find_one_indexed(
        &self,
        table: TableId,
        key: NumericalVariant,
        offset: usize,
    ) -> Result<Option<EntryId>> {
        let inner = self.inner.read();
        let table = inner.table(table)?;
        let index = table
            .index_covering(key.kind(), offset)
            .ok_or_else(|| index_missing(table, offset))?;

        Counters::bump(&self.counters.finds);
        Ok(index.find_one(&key))
    }

    /// Every id whose indexed field equals `key`, in insertion order.
    ///
    /// This is an equal-match enumeration over duplicates, not a numeric
    /// range scan.
    pub fn find_range_indexed(
        &self,
        table: TableId,
        key: NumericalVariant,
        offset: usize,
    ) -> Result<Vec<EntryId>> {
        let inner = self.inner.read();
        let table = inner.table(table)?;
        let index = table
            .index_covering(key.kind(), offset)
            .ok_or_else(|| index_missing(table, offset))?;

        Counters::bump(&self.counters.finds);
        Ok(index.find_all(&key))
    }

    // =========================================================================
    // Select
    // =========================================================================

    /// Invoke a callback with a read-only view of one occupied record.
    ///
    /// Returns `Ok(None)` if `id` is not occupied (expected miss).
    pub fn select<R: Record, T>(
        &self,
        table: TableId,
        id: EntryId,
        f: impl FnOnce(&R) -> T,
    ) -> Result<Option<T>> {
        let inner = self.inner.read();
        let table = inner.table(table)?;
        table.check_layout(mem::size_of::<R>(), mem::align_of::<R>())?;

        Counters::bump(&self.counters.selects);
        let Some(slot) = table.slot_bytes(id) else {
            return Ok(None);
        };
        let record: R = bytemuck::pod_read_unaligned(slot);
        Ok(Some(f(&record)))
    }

    /// Invoke a callback with a mutable view of one occupied record and
    /// write the result back, marking the slot dirty.
    ///
    /// The header is re-stamped afterwards, so a callback cannot corrupt
    /// the id or occupancy flags.
    pub fn select_mut<R: Record, T>(
        &self,
        table: TableId,
        id: EntryId,
        f: impl FnOnce(&mut R) -> T,
    ) -> Result<Option<T>> {
        let mut inner = self.inner.write();
        let table = inner.table_mut(table)?;
        table.check_layout(mem::size_of::<R>(), mem::align_of::<R>())?;

        let Some(slot) = table.slot_bytes(id) else {
            return Ok(None);
        };
        let mut record: R = bytemuck::pod_read_unaligned(slot);
        let out = f(&mut record);

        // Indexed fields may have changed; re-key before writing back
        table.check_unique(bytemuck::bytes_of(&record), Some(id))?;
        table.index_remove(id);
        table.write_record(id, bytemuck::bytes_of(&record));
        table.index_insert(id)?;

        Counters::bump(&self.counters.selects);
        Ok(Some(out))
    }

    /// Read-only raw-byte select for type-erased callers
    pub fn select_raw<T>(
        &self,
        table: TableId,
        id: EntryId,
        size: usize,
        align: usize,
        f: impl FnOnce(&[u8]) -> T,
    ) -> Result<Option<T>> {
        let inner = self.inner.read();
        let table = inner.table(table)?;
        table.check_layout(size, align)?;

        Counters::bump(&self.counters.selects);
        Ok(table.slot_bytes(id).map(f))
    }

    /// Mutable raw-byte select for type-erased callers.
    ///
    /// The callback mutates a copy; the write-back re-stamps the header,
    /// marks the slot dirty, and re-keys every index, exactly like
    /// [`select_mut`](Self::select_mut). A unique-key conflict rejects the
    /// write-back and leaves the record unchanged.
    pub fn select_raw_mut<T>(
        &self,
        table: TableId,
        id: EntryId,
        size: usize,
        align: usize,
        f: impl FnOnce(&mut [u8]) -> T,
    ) -> Result<Option<T>> {
        let mut inner = self.inner.write();
        let table = inner.table_mut(table)?;
        table.check_layout(size, align)?;

        let Some(slot) = table.slot_bytes(id) else {
            return Ok(None);
        };
        let mut bytes = slot.to_vec();
        let out = f(&mut bytes);

        // Indexed fields may have changed; re-key before writing back
        table.check_unique(&bytes, Some(id))?;
        table.index_remove(id);
        table.write_record(id, &bytes);
        table.index_insert(id)?;

        Counters::bump(&self.counters.selects);
        Ok(Some(out))
    }

    // =========================================================================
    // Statistics & Tuning
    // =========================================================================

    /// Lock-free snapshot of store-wide counters
    pub fn stats(&self) -> StoreStats {
        self.counters.snapshot()
    }

    /// Snapshot of one table's storage state
    pub fn table_stats(&self, table: TableId) -> Result<TableStats> {
        let inner = self.inner.read();
        Ok(inner.table(table)?.stats())
    }

    /// Tune a table's free-slot reuse pool bound (correctness-neutral)
    pub fn set_table_free_cache(&self, table: TableId, size: usize) -> Result<()> {
        let mut inner = self.inner.write();
        inner.table_mut(table)?.set_free_cache(size);
        Ok(())
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Bind a root directory for whole-database `save()`/`load()`
    pub fn open(&self, dir: impl Into<PathBuf>) -> Result<()> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        self.inner.write().data_dir = Some(dir);
        Ok(())
    }

    /// Unbind the persistence root
    pub fn close(&self) {
        self.inner.write().data_dir = None;
    }

    /// Serialize a table's records to a snapshot file.
    ///
    /// With `full_flush` every occupied record is written; otherwise only
    /// records dirtied since the previous save, making the file a complete
    /// snapshot only if everything was dirtied since the last full write.
    /// A successful write clears the table's dirty state.
    pub fn write_table_to_file(&self, table: TableId, path: &Path, full_flush: bool) -> Result<()> {
        let mode = if full_flush { SaveMode::Full } else { SaveMode::Dirty };
        let mut inner = self.inner.write();
        let table = inner.table_mut(table)?;

        let ids = ids_for_mode(table, mode);
        persist::write_snapshot(table, path, &ids)?;
        table.clear_dirty();

        Counters::bump(&self.counters.saves);
        tracing::info!(table = table.name(), records = ids.len(), path = %path.display(), "table written");
        Ok(())
    }

    /// Replace a table's contents from a snapshot file, reproducing the
    /// original EntryId assignment exactly.
    ///
    /// The file is fully validated (magic, version, layout, checksum,
    /// id uniqueness) before the live table is touched, so a corrupt file
    /// can never partially populate it.
    pub fn read_table_from_file(&self, table: TableId, path: &Path) -> Result<()> {
        let snapshot = persist::read_snapshot(path)?;

        let mut inner = self.inner.write();
        let table = inner.table_mut(table)?;
        self.apply_snapshot(table, snapshot)?;

        Counters::bump(&self.counters.loads);
        tracing::info!(table = table.name(), records = table.used(), path = %path.display(), "table loaded");
        Ok(())
    }

    /// Write every table to the bound directory, one `<name>.mdb` file each.
    ///
    /// Dirty state is cleared only after every table's file has been
    /// written, so a failed save leaves the next save with the same work
    /// still pending.
    pub fn save(&self, mode: SaveMode) -> Result<()> {
        let mut inner = self.inner.write();
        let dir = inner.data_dir.clone().ok_or(MemDbError::NotOpen)?;

        for table in inner.tables.values() {
            let path = dir.join(format!("{}.{}", table.name(), SNAPSHOT_EXT));
            let ids = ids_for_mode(table, mode);
            persist::write_snapshot(table, &path, &ids)?;
        }
        for table in inner.tables.values_mut() {
            table.clear_dirty();
            Counters::bump(&self.counters.saves);
        }

        tracing::info!(tables = inner.tables.len(), ?mode, dir = %dir.display(), "database saved");
        Ok(())
    }

    /// Load every registered table from the bound directory.
    ///
    /// Tables without a snapshot file are left untouched. Every present
    /// file is read and validated before the first table is replaced, so
    /// one corrupt file leaves the whole store exactly as it was.
    pub fn load(&self) -> Result<()> {
        let mut inner = self.inner.write();
        let dir = inner.data_dir.clone().ok_or(MemDbError::NotOpen)?;

        let ids: Vec<TableId> = inner.tables.keys().copied().collect();
        let mut snapshots: Vec<(TableId, Snapshot)> = Vec::with_capacity(ids.len());
        for id in ids {
            let table = inner.table(id)?;
            let path = dir.join(format!("{}.{}", table.name(), SNAPSHOT_EXT));
            if !path.exists() {
                tracing::debug!(table = table.name(), "no snapshot file, table left as-is");
                continue;
            }
            let snapshot = persist::read_snapshot(&path)?;
            check_snapshot_layout(table, &snapshot.header)?;
            snapshots.push((id, snapshot));
        }

        for (id, snapshot) in snapshots {
            let table = inner.table_mut(id)?;
            self.apply_snapshot(table, snapshot)?;
            Counters::bump(&self.counters.loads);
        }

        tracing::info!(dir = %dir.display(), "database loaded");
        Ok(())
    }

    /// Stream a table's records into a caller-supplied sink.
    ///
    /// The sink receives `begin_commit`, one `commit` per selected record
    /// (offset = slot × entry size), then `end_commit`; it is borrowed only
    /// for this call. A successful commit clears the table's dirty state.
    pub fn commit_dirty(
        &self,
        table: TableId,
        sink: &mut dyn EntryWriter,
        mode: SaveMode,
    ) -> Result<()> {
        let mut inner = self.inner.write();
        let table = inner.table_mut(table)?;

        let ids = ids_for_mode(table, mode);
        persist::commit_table(table, sink, &ids)?;
        table.clear_dirty();

        Counters::bump(&self.counters.saves);
        Ok(())
    }

    /// Replace a table's contents from a raw whole-table image
    /// (`N × entry_size` bytes, occupancy read from each slot's embedded
    /// header) — the ingest counterpart of the `commit_dirty` stream.
    pub fn load_table_data(&self, table: TableId, bytes: &[u8]) -> Result<()> {
        let mut inner = self.inner.write();
        let table = inner.table_mut(table)?;
        let entry_size = table.entry_size();

        if bytes.len() % entry_size != 0 {
            return Err(MemDbError::Corruption(format!(
                "table '{}': image of {} bytes is not a multiple of entry size {}",
                table.name(),
                bytes.len(),
                entry_size
            )));
        }

        // Validate the whole image before touching the live table
        for (slot, chunk) in bytes.chunks_exact(entry_size).enumerate() {
            let header = entry::header_of(chunk);
            if header.occupied() && header.id.index() != slot {
                return Err(MemDbError::Corruption(format!(
                    "table '{}': slot {} carries entry id {}",
                    table.name(),
                    slot,
                    header.id
                )));
            }
        }

        let (cap_before, used_before) = (table.capacity(), table.used());
        table.clear();
        for chunk in bytes.chunks_exact(entry_size) {
            let header = entry::header_of(chunk);
            if header.occupied() {
                table.place_record(header.id, chunk)?;
            }
        }
        table.rebuild_after_load()?;

        self.track_growth(cap_before, table);
        self.track_used(used_before, table);
        Counters::bump(&self.counters.loads);
        Ok(())
    }

    /// Drop every table, index, and registry entry; unbind the persistence
    /// root; zero the counters. TableIds start fresh afterwards.
    pub fn release(&self) {
        let mut inner = self.inner.write();
        inner.tables.clear();
        inner.names.clear();
        inner.next_table_id = 0;
        inner.data_dir = self.config.data_dir.clone();
        self.counters.reset();
        tracing::debug!("store released");
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Replace `table`'s contents from a validated snapshot
    fn apply_snapshot(&self, table: &mut Table, snapshot: Snapshot) -> Result<()> {
        check_snapshot_layout(table, &snapshot.header)?;

        let (cap_before, used_before) = (table.capacity(), table.used());
        table.clear();
        for (id, record) in &snapshot.records {
            table.place_record(*id, record)?;
        }
        table.rebuild_after_load()?;

        self.track_growth(cap_before, table);
        self.track_used(used_before, table);
        Ok(())
    }

    /// Fold a table growth that happened under the lock into the byte
    /// counters
    fn track_growth(&self, cap_before: usize, table: &Table) {
        if table.capacity() > cap_before {
            Counters::add(
                &self.counters.bytes_allocated,
                ((table.capacity() - cap_before) * table.entry_size()) as u64,
            );
        }
    }

    /// Fold an occupancy change into the byte counters
    fn track_used(&self, used_before: usize, table: &Table) {
        let stride = table.entry_size() as u64;
        let (before, after) = (used_before as u64 * stride, table.used() as u64 * stride);
        if after >= before {
            Counters::add(&self.counters.bytes_used, after - before);
        } else {
            Counters::sub(&self.counters.bytes_used, before - after);
        }
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve a save mode to the exact ids it emits
fn ids_for_mode(table: &Table, mode: SaveMode) -> Vec<EntryId> {
    match mode {
        SaveMode::Full => table.occupied_ids().collect(),
        SaveMode::Dirty => table
            .occupied_ids()
            .filter(|&id| table.is_dirty(id))
            .collect(),
        SaveMode::DirtyList => table.dirty_ids().to_vec(),
    }
}

/// Reject a snapshot whose record layout differs from the live table's
fn check_snapshot_layout(table: &Table, header: &SnapshotHeader) -> Result<()> {
    if header.entry_size as usize != table.entry_size()
        || header.entry_align as usize != table.entry_align()
    {
        return Err(MemDbError::LayoutMismatch {
            expected_size: table.entry_size(),
            expected_align: table.entry_align(),
            got_size: header.entry_size as usize,
            got_align: header.entry_align as usize,
        });
    }
    Ok(())
}

fn index_missing(table: &Table, offset: usize) -> MemDbError {
    MemDbError::IndexNotFound(format!(
        "table '{}' has no index on the field at offset {}",
        table.name(),
        offset
    ))
}
