//! Tests for snapshot persistence
//!
//! These tests verify:
//! - Full snapshot round-trip with identical EntryId assignment
//! - Dirty and dirty-list save modes
//! - Corrupt-file rejection before any record reaches the live table
//! - Whole-database save/load against a bound directory
//! - The EntryWriter sink protocol and its raw-image counterpart

use std::path::PathBuf;

use bytemuck::{Pod, Zeroable};
use memdb::{
    EntryHeader, EntryId, EntryWriter, MemDbError, NumericalVariant, Record, Result, SaveMode,
    Store, TableId, VariantKind,
};
use tempfile::TempDir;

// =============================================================================
// Test Record Type
// =============================================================================

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
struct Item {
    header: EntryHeader,
    uid: u32,
    count: u32,
}

impl Record for Item {
    fn header(&self) -> &EntryHeader {
        &self.header
    }
    fn header_mut(&mut self) -> &mut EntryHeader {
        &mut self.header
    }
}

fn item(uid: u32, count: u32) -> Item {
    let mut i = Item::zeroed();
    i.uid = uid;
    i.count = count;
    i
}

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("items.mdb");
    (temp_dir, path)
}

fn store_with_items(count: u32) -> (Store, TableId, Vec<EntryId>) {
    let store = Store::new();
    let t = store.create_table_for::<Item>("items").unwrap();
    let ids = (0..count)
        .map(|i| store.insert(t, &item(i, i * 10)).unwrap())
        .collect();
    (store, t, ids)
}

// =============================================================================
// Round-Trip Tests
// =============================================================================

#[test]
fn test_full_snapshot_round_trip() {
    let (_temp, path) = setup_temp();
    let (store, t, ids) = store_with_items(20);
    store.write_table_to_file(t, &path, true).unwrap();

    // Fresh store, same schema
    let fresh = Store::new();
    let t2 = fresh.create_table_for::<Item>("items").unwrap();
    fresh.read_table_from_file(t2, &path).unwrap();

    assert_eq!(fresh.table_stats(t2).unwrap().used, 20);

    // EntryId assignment reproduced exactly
    for (i, &id) in ids.iter().enumerate() {
        let got = fresh.select(t2, id, |it: &Item| (it.uid, it.count)).unwrap();
        assert_eq!(got, Some((i as u32, i as u32 * 10)));
    }
}

#[test]
fn test_round_trip_preserves_slot_gaps() {
    let (_temp, path) = setup_temp();
    let (store, t, ids) = store_with_items(10);

    // Punch holes so the id assignment is non-contiguous
    store.delete(t, ids[2]).unwrap();
    store.delete(t, ids[7]).unwrap();

    store.write_table_to_file(t, &path, true).unwrap();

    let fresh = Store::new();
    let t2 = fresh.create_table_for::<Item>("items").unwrap();
    fresh.read_table_from_file(t2, &path).unwrap();

    assert_eq!(fresh.table_stats(t2).unwrap().used, 8);
    assert_eq!(fresh.select(t2, ids[2], |it: &Item| it.uid).unwrap(), None);
    assert_eq!(
        fresh.select(t2, ids[8], |it: &Item| it.uid).unwrap(),
        Some(8)
    );
}

#[test]
fn test_read_replaces_existing_contents() {
    let (_temp, path) = setup_temp();
    let (store, t, _ids) = store_with_items(3);
    store.write_table_to_file(t, &path, true).unwrap();

    let other = Store::new();
    let t2 = other.create_table_for::<Item>("items").unwrap();
    for i in 100..110 {
        other.insert(t2, &item(i, 0)).unwrap();
    }

    other.read_table_from_file(t2, &path).unwrap();

    // Old contents are gone, replaced by the snapshot's three records
    assert_eq!(other.table_stats(t2).unwrap().used, 3);
    assert!(other.find_one(t2, |it: &Item| it.uid == 105).unwrap().is_none());
}

#[test]
fn test_load_rebuilds_indices() {
    let (_temp, path) = setup_temp();
    let (store, t, ids) = store_with_items(10);
    store.write_table_to_file(t, &path, true).unwrap();

    let fresh = Store::new();
    let t2 = fresh.create_table_for::<Item>("items").unwrap();
    fresh.create_index(t2, VariantKind::U32, 8, false).unwrap();
    fresh.read_table_from_file(t2, &path).unwrap();

    let found = fresh
        .find_one_indexed(t2, NumericalVariant::U32(4), 8)
        .unwrap();
    assert_eq!(found, Some(ids[4]));
}

// =============================================================================
// Dirty Mode Tests
// =============================================================================

#[test]
fn test_dirty_write_emits_only_modified_records() {
    let (_temp, path) = setup_temp();
    let (store, t, ids) = store_with_items(10);

    // Full save clears all dirty state
    store.write_table_to_file(t, &path, true).unwrap();

    // Touch two records, then save dirty-only to a second file
    store.update_one(t, ids[3], &item(3, 999)).unwrap();
    store.update_one(t, ids[6], &item(6, 888)).unwrap();

    let dirty_path = path.with_extension("dirty.mdb");
    store.write_table_to_file(t, &dirty_path, false).unwrap();

    let fresh = Store::new();
    let t2 = fresh.create_table_for::<Item>("items").unwrap();
    fresh.read_table_from_file(t2, &dirty_path).unwrap();

    assert_eq!(fresh.table_stats(t2).unwrap().used, 2);
    assert_eq!(
        fresh.select(t2, ids[3], |it: &Item| it.count).unwrap(),
        Some(999)
    );
    assert_eq!(
        fresh.select(t2, ids[6], |it: &Item| it.count).unwrap(),
        Some(888)
    );
}

#[test]
fn test_successful_save_clears_dirty_state() {
    let (_temp, path) = setup_temp();
    let (store, t, _ids) = store_with_items(5);

    assert_eq!(store.table_stats(t).unwrap().dirty_count, 5);
    store.write_table_to_file(t, &path, true).unwrap();
    assert_eq!(store.table_stats(t).unwrap().dirty_count, 0);

    // Nothing dirty: a dirty-mode write produces an empty snapshot
    let dirty_path = path.with_extension("dirty.mdb");
    store.write_table_to_file(t, &dirty_path, false).unwrap();

    let fresh = Store::new();
    let t2 = fresh.create_table_for::<Item>("items").unwrap();
    fresh.read_table_from_file(t2, &dirty_path).unwrap();
    assert_eq!(fresh.table_stats(t2).unwrap().used, 0);
}

// =============================================================================
// Corruption Tests
// =============================================================================

#[test]
fn test_read_nonexistent_file_fails() {
    let (_temp, path) = setup_temp();
    let store = Store::new();
    let t = store.create_table_for::<Item>("items").unwrap();

    assert!(store.read_table_from_file(t, &path).is_err());
}

#[test]
fn test_read_garbage_file_fails() {
    let (_temp, path) = setup_temp();
    std::fs::write(&path, b"GARBAGE_DATA_NOT_A_SNAPSHOT").unwrap();

    let store = Store::new();
    let t = store.create_table_for::<Item>("items").unwrap();

    let result = store.read_table_from_file(t, &path);
    assert!(matches!(result, Err(MemDbError::Corruption(_))));
}

#[test]
fn test_corrupt_file_never_partially_populates() {
    let (_temp, path) = setup_temp();
    let (store, t, _ids) = store_with_items(10);
    store.write_table_to_file(t, &path, true).unwrap();

    // Flip a byte in the record section; the CRC must catch it
    let mut bytes = std::fs::read(&path).unwrap();
    let mid = bytes.len() / 2;
    bytes[mid] ^= 0xFF;
    std::fs::write(&path, &bytes).unwrap();

    let fresh = Store::new();
    let t2 = fresh.create_table_for::<Item>("items").unwrap();
    fresh.insert(t2, &item(1, 1)).unwrap();

    let result = fresh.read_table_from_file(t2, &path);
    assert!(matches!(result, Err(MemDbError::Corruption(_))));

    // The live table is untouched
    assert_eq!(fresh.table_stats(t2).unwrap().used, 1);
}

#[test]
fn test_truncated_file_fails() {
    let (_temp, path) = setup_temp();
    let (store, t, _ids) = store_with_items(10);
    store.write_table_to_file(t, &path, true).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    std::fs::write(&path, &bytes[..bytes.len() - 10]).unwrap();

    let fresh = Store::new();
    let t2 = fresh.create_table_for::<Item>("items").unwrap();
    let result = fresh.read_table_from_file(t2, &path);
    assert!(matches!(result, Err(MemDbError::Corruption(_))));
}

/// Mirrors the on-disk header so tests can hand-build hostile snapshots
#[derive(serde::Serialize)]
struct RawSnapshotHeader {
    table_name: String,
    entry_size: u32,
    entry_align: u32,
    capacity: u32,
    high_water: u32,
    record_count: u32,
}

fn write_hostile_snapshot(path: &std::path::Path, entry_size: u32, record_count: u32) {
    let header = RawSnapshotHeader {
        table_name: "items".to_string(),
        entry_size,
        entry_align: 4,
        capacity: 1,
        high_water: 1,
        record_count,
    };
    let header_bytes = bincode::serialize(&header).unwrap();

    let mut file = Vec::new();
    file.extend_from_slice(b"MDBT");
    file.extend_from_slice(&1u16.to_le_bytes());
    file.extend_from_slice(&(header_bytes.len() as u32).to_le_bytes());
    file.extend_from_slice(&header_bytes);
    std::fs::write(path, &file).unwrap();
}

#[test]
fn test_overflowing_header_counts_rejected() {
    let (_temp, path) = setup_temp();
    write_hostile_snapshot(&path, u32::MAX, u32::MAX);

    let store = Store::new();
    let t = store.create_table_for::<Item>("items").unwrap();

    let result = store.read_table_from_file(t, &path);
    assert!(matches!(result, Err(MemDbError::Corruption(_))));
}

#[test]
fn test_record_count_beyond_file_size_rejected() {
    let (_temp, path) = setup_temp();

    // Plausible entry size, but the claimed section dwarfs the actual file
    write_hostile_snapshot(&path, 16, 1 << 30);

    let store = Store::new();
    let t = store.create_table_for::<Item>("items").unwrap();

    let result = store.read_table_from_file(t, &path);
    assert!(matches!(result, Err(MemDbError::Corruption(_))));
    assert_eq!(store.table_stats(t).unwrap().used, 0);
}

#[test]
fn test_mismatched_record_layout_rejected() {
    let (_temp, path) = setup_temp();
    let (store, t, _ids) = store_with_items(5);
    store.write_table_to_file(t, &path, true).unwrap();

    // A reader whose table expects 24-byte records must reject the
    // 16-byte-record snapshot
    let fresh = Store::new();
    let t2 = fresh.create_table("wider", 24, 4).unwrap();

    let result = fresh.read_table_from_file(t2, &path);
    assert!(matches!(result, Err(MemDbError::LayoutMismatch { .. })));
}

// =============================================================================
// Whole-Database Save/Load Tests
// =============================================================================

#[test]
fn test_save_without_open_fails() {
    let (store, _t, _ids) = store_with_items(3);
    assert!(matches!(store.save(SaveMode::Full), Err(MemDbError::NotOpen)));
    assert!(matches!(store.load(), Err(MemDbError::NotOpen)));
}

#[test]
fn test_save_and_load_all_tables() {
    let temp = TempDir::new().unwrap();

    let store = Store::new();
    let items = store.create_table_for::<Item>("items").unwrap();
    let spares = store.create_table_for::<Item>("spares").unwrap();
    let a = store.insert(items, &item(1, 10)).unwrap();
    let b = store.insert(spares, &item(2, 20)).unwrap();

    store.open(temp.path()).unwrap();
    store.save(SaveMode::Full).unwrap();
    store.close();

    assert!(temp.path().join("items.mdb").exists());
    assert!(temp.path().join("spares.mdb").exists());

    let fresh = Store::new();
    let items2 = fresh.create_table_for::<Item>("items").unwrap();
    let spares2 = fresh.create_table_for::<Item>("spares").unwrap();
    fresh.open(temp.path()).unwrap();
    fresh.load().unwrap();

    assert_eq!(fresh.select(items2, a, |it: &Item| it.uid).unwrap(), Some(1));
    assert_eq!(fresh.select(spares2, b, |it: &Item| it.uid).unwrap(), Some(2));
}

#[test]
fn test_corrupt_file_among_many_leaves_every_table_untouched() {
    let temp = TempDir::new().unwrap();

    let store = Store::new();
    let a = store.create_table_for::<Item>("alpha").unwrap();
    let b = store.create_table_for::<Item>("beta").unwrap();
    store.insert(a, &item(1, 1)).unwrap();
    store.insert(b, &item(2, 2)).unwrap();
    store.open(temp.path()).unwrap();
    store.save(SaveMode::Full).unwrap();

    // Corrupt only beta's snapshot
    let beta_path = temp.path().join("beta.mdb");
    let mut bytes = std::fs::read(&beta_path).unwrap();
    let mid = bytes.len() / 2;
    bytes[mid] ^= 0xFF;
    std::fs::write(&beta_path, &bytes).unwrap();

    let fresh = Store::new();
    let a2 = fresh.create_table_for::<Item>("alpha").unwrap();
    let b2 = fresh.create_table_for::<Item>("beta").unwrap();
    fresh.insert(a2, &item(100, 0)).unwrap();
    fresh.insert(b2, &item(200, 0)).unwrap();
    fresh.open(temp.path()).unwrap();

    let result = fresh.load();
    assert!(matches!(result, Err(MemDbError::Corruption(_))));

    // Neither table was replaced, including the one whose file was valid
    assert!(fresh.find_one(a2, |i: &Item| i.uid == 100).unwrap().is_some());
    assert!(fresh.find_one(b2, |i: &Item| i.uid == 200).unwrap().is_some());
}

#[test]
fn test_failed_save_clears_no_dirty_state() {
    let temp = TempDir::new().unwrap();

    let store = Store::new();
    let a = store.create_table_for::<Item>("alpha").unwrap();
    let b = store.create_table_for::<Item>("beta").unwrap();
    store.insert(a, &item(1, 1)).unwrap();
    store.insert(b, &item(2, 2)).unwrap();
    store.open(temp.path()).unwrap();

    // A directory squatting on beta's snapshot path makes its write fail
    std::fs::create_dir(temp.path().join("beta.mdb")).unwrap();

    assert!(store.save(SaveMode::Full).is_err());

    // No table's dirty state was cleared, so the next save retries all of it
    assert_eq!(store.table_stats(a).unwrap().dirty_count, 1);
    assert_eq!(store.table_stats(b).unwrap().dirty_count, 1);
}

#[test]
fn test_load_skips_tables_without_snapshots() {
    let temp = TempDir::new().unwrap();

    let store = Store::new();
    let t = store.create_table_for::<Item>("never_saved").unwrap();
    store.insert(t, &item(1, 1)).unwrap();

    store.open(temp.path()).unwrap();
    store.load().unwrap();

    // No file existed; the table keeps its in-memory contents
    assert_eq!(store.table_stats(t).unwrap().used, 1);
}

#[test]
fn test_dirty_list_save_mode() {
    let temp = TempDir::new().unwrap();
    let (store, t, ids) = store_with_items(100);

    store.open(temp.path()).unwrap();
    store.save(SaveMode::Full).unwrap();

    // One sparse write, then the cheap dirty-list save
    store.update_one(t, ids[42], &item(42, 4242)).unwrap();
    store.save(SaveMode::DirtyList).unwrap();

    let fresh = Store::new();
    let t2 = fresh.create_table_for::<Item>("items").unwrap();
    fresh.open(temp.path()).unwrap();
    fresh.load().unwrap();

    assert_eq!(fresh.table_stats(t2).unwrap().used, 1);
    assert_eq!(
        fresh.select(t2, ids[42], |it: &Item| it.count).unwrap(),
        Some(4242)
    );
}

// =============================================================================
// EntryWriter Sink Tests
// =============================================================================

/// A sink that reassembles the commit stream into a whole table image
#[derive(Default)]
struct ImageSink {
    image: Vec<u8>,
    began: bool,
    ended: bool,
    commits: usize,
}

impl EntryWriter for ImageSink {
    fn begin_commit(
        &mut self,
        capacity: usize,
        entry_size: usize,
        _entry_align: usize,
    ) -> Result<()> {
        self.image = vec![0u8; capacity * entry_size];
        self.began = true;
        Ok(())
    }

    fn commit(&mut self, bytes: &[u8], _entry_align: usize, offset: usize) -> Result<()> {
        self.image[offset..offset + bytes.len()].copy_from_slice(bytes);
        self.commits += 1;
        Ok(())
    }

    fn end_commit(&mut self) -> Result<()> {
        self.ended = true;
        Ok(())
    }
}

#[test]
fn test_commit_dirty_drives_sink_protocol() {
    let (store, t, _ids) = store_with_items(7);

    let mut sink = ImageSink::default();
    store.commit_dirty(t, &mut sink, SaveMode::Full).unwrap();

    assert!(sink.began);
    assert!(sink.ended);
    assert_eq!(sink.commits, 7);
}

#[test]
fn test_commit_image_round_trips_through_load_table_data() {
    let (store, t, ids) = store_with_items(7);
    store.delete(t, ids[2]).unwrap();

    let mut sink = ImageSink::default();
    store.commit_dirty(t, &mut sink, SaveMode::Full).unwrap();

    // Feed the reassembled image into a fresh table
    let fresh = Store::new();
    let t2 = fresh.create_table_for::<Item>("items").unwrap();
    fresh.load_table_data(t2, &sink.image).unwrap();

    assert_eq!(fresh.table_stats(t2).unwrap().used, 6);
    assert_eq!(fresh.select(t2, ids[2], |it: &Item| it.uid).unwrap(), None);
    assert_eq!(
        fresh.select(t2, ids[5], |it: &Item| it.uid).unwrap(),
        Some(5)
    );
}

#[test]
fn test_commit_dirty_clears_dirty_state() {
    let (store, t, _ids) = store_with_items(4);

    let mut sink = ImageSink::default();
    store.commit_dirty(t, &mut sink, SaveMode::DirtyList).unwrap();
    assert_eq!(sink.commits, 4);

    // A second dirty-list commit has nothing left to emit
    let mut sink2 = ImageSink::default();
    store.commit_dirty(t, &mut sink2, SaveMode::DirtyList).unwrap();
    assert_eq!(sink2.commits, 0);
}

#[test]
fn test_load_table_data_rejects_misaligned_image() {
    let store = Store::new();
    let t = store.create_table_for::<Item>("items").unwrap();

    let result = store.load_table_data(t, &[0u8; 7]);
    assert!(matches!(result, Err(MemDbError::Corruption(_))));
}
