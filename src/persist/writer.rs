//! Snapshot writer
//!
//! Serializes a chosen set of a table's occupied records to a snapshot
//! file: header, record section with running CRC, checksum footer.

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::entry::EntryId;
use crate::error::{MemDbError, Result};
use crate::table::Table;

use super::{SnapshotHeader, MAGIC, VERSION};

/// Write `ids` (occupied slots of `table`, already chosen per save mode)
/// to a snapshot file at `path`. The record count is known up front, so
/// the header is final on the first pass.
pub(crate) fn write_snapshot(table: &Table, path: &Path, ids: &[EntryId]) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;
    let mut writer = BufWriter::new(file);

    let header = SnapshotHeader {
        table_name: table.name().to_string(),
        entry_size: table.entry_size() as u32,
        entry_align: table.entry_align() as u32,
        capacity: table.capacity() as u32,
        high_water: table.high_water() as u32,
        record_count: ids.len() as u32,
    };
    let header_bytes = bincode::serialize(&header)
        .map_err(|e| MemDbError::Serialization(format!("snapshot header: {}", e)))?;

    writer.write_all(MAGIC)?;
    writer.write_all(&VERSION.to_le_bytes())?;
    writer.write_all(&(header_bytes.len() as u32).to_le_bytes())?;
    writer.write_all(&header_bytes)?;

    // Record section with running CRC
    let mut hasher = crc32fast::Hasher::new();
    for &id in ids {
        let record = table.slot_bytes(id).ok_or_else(|| {
            MemDbError::Corruption(format!(
                "table '{}': dirty list names freed entry {}",
                table.name(),
                id
            ))
        })?;

        let id_bytes = id.0.to_le_bytes();
        writer.write_all(&id_bytes)?;
        writer.write_all(record)?;
        hasher.update(&id_bytes);
        hasher.update(record);
    }

    // Footer: CRC over the record section
    writer.write_all(&hasher.finalize().to_le_bytes())?;

    let file = writer
        .into_inner()
        .map_err(|e| MemDbError::Io(e.into_error()))?;
    file.sync_all()?;

    Ok(())
}
