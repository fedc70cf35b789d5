//! Snapshot reader
//!
//! Opens snapshot files and validates them completely — magic, version,
//! layout metadata, record ids, and checksum — before a single record is
//! handed back. A corrupt file can never partially populate a live table.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::entry::EntryId;
use crate::error::{MemDbError, Result};

use super::{SnapshotHeader, MAGIC, VERSION};

/// A fully-validated, decoded snapshot, ready to replay into a table
#[derive(Debug)]
pub(crate) struct Snapshot {
    pub header: SnapshotHeader,
    /// `(id, record bytes)` in file order; ids verified unique and valid
    pub records: Vec<(EntryId, Vec<u8>)>,
}

/// Read and validate a snapshot file
pub(crate) fn read_snapshot(path: &Path) -> Result<Snapshot> {
    let mut file = File::open(path)?;

    // Fixed preamble: magic + version + header length
    let mut preamble = [0u8; 10];
    file.read_exact(&mut preamble)
        .map_err(|_| corrupt(path, "file shorter than preamble"))?;

    if &preamble[0..4] != MAGIC {
        return Err(corrupt(
            path,
            &format!("bad magic {:?}, expected MDBT", &preamble[0..4]),
        ));
    }

    let version = u16::from_le_bytes(preamble[4..6].try_into().unwrap());
    if version != VERSION {
        return Err(corrupt(
            path,
            &format!("unsupported snapshot version {}", version),
        ));
    }

    let header_len = u32::from_le_bytes(preamble[6..10].try_into().unwrap()) as usize;
    let mut header_bytes = vec![0u8; header_len];
    file.read_exact(&mut header_bytes)
        .map_err(|_| corrupt(path, "truncated header"))?;

    let header: SnapshotHeader = bincode::deserialize(&header_bytes)
        .map_err(|e| MemDbError::Serialization(format!("snapshot header: {}", e)))?;

    let entry_size = header.entry_size as usize;
    if entry_size == 0 {
        return Err(corrupt(path, "zero entry size in header"));
    }

    // Record section, read whole before any validation result is committed.
    // Both lengths come from the untrusted header; bound them against the
    // actual file size before allocating a byte.
    let section_len = (header.record_count as u64)
        .checked_mul(4 + entry_size as u64)
        .ok_or_else(|| corrupt(path, "record section length overflows"))?;
    let body_len = file
        .metadata()?
        .len()
        .saturating_sub(10 + header_len as u64);
    if section_len.checked_add(4).map_or(true, |n| n > body_len) {
        return Err(corrupt(
            path,
            &format!(
                "header claims a {}-byte record section but only {} bytes follow",
                section_len, body_len
            ),
        ));
    }
    let mut section = vec![0u8; section_len as usize];
    file.read_exact(&mut section)
        .map_err(|_| corrupt(path, "truncated record section"))?;

    // Footer CRC covers the whole record section
    let mut footer = [0u8; 4];
    file.read_exact(&mut footer)
        .map_err(|_| corrupt(path, "missing checksum footer"))?;
    let expected_crc = u32::from_le_bytes(footer);
    let actual_crc = crc32fast::hash(&section);
    if actual_crc != expected_crc {
        return Err(corrupt(
            path,
            &format!(
                "checksum mismatch: stored {:#010x}, computed {:#010x}",
                expected_crc, actual_crc
            ),
        ));
    }

    // Parse records; ids must be valid and unique or the file is rejected
    let mut records = Vec::with_capacity(header.record_count as usize);
    let mut seen = BTreeSet::new();
    for chunk in section.chunks_exact(4 + entry_size) {
        let id = EntryId(u32::from_le_bytes(chunk[0..4].try_into().unwrap()));
        if !id.is_valid() {
            return Err(corrupt(path, "record carries the invalid entry id"));
        }
        if !seen.insert(id) {
            return Err(corrupt(path, &format!("entry {} appears twice", id)));
        }
        records.push((id, chunk[4..].to_vec()));
    }

    Ok(Snapshot { header, records })
}

fn corrupt(path: &Path, detail: &str) -> MemDbError {
    MemDbError::Corruption(format!("{}: {}", path.display(), detail))
}
